use serde_json::{Map, Value};

/// A single cell value read from a source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Replace NaN and infinite floats with `Null`.
    ///
    /// The push API rejects non-finite numeric literals and `serde_json` cannot
    /// encode them either.
    pub fn normalized(self) -> Self {
        match self {
            Scalar::Float(f) if !f.is_finite() => Scalar::Null,
            other => other,
        }
    }

    /// JSON value with the scalar's native type.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            // from_f64 returns None for non-finite values
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    /// JSON value rendered as a string, for columns declared as `string`.
    pub fn to_json_text(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::String(if *b { "True" } else { "False" }.to_string()),
            Scalar::Int(i) => Value::String(i.to_string()),
            Scalar::Float(f) if f.is_finite() => Value::String(float_text(*f)),
            Scalar::Float(_) => Value::Null,
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Integral floats keep a trailing `.0` so `3.0` stays distinguishable from
/// the integer `3`.
fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// How rows are encoded when pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    /// Keep each scalar's JSON type (numbers stay numbers).
    Native,
    /// Render every non-null scalar as a string.
    Text,
}

/// A parsed source file: ordered columns and rows of scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// Build a table, padding or truncating every row to the column count and
    /// normalizing non-finite floats to `Null`.
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut row: Vec<Scalar> = row.into_iter().map(Scalar::normalized).collect();
                row.resize(width, Scalar::Null);
                row
            })
            .collect();

        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Encode one row as a `{column: value}` JSON object.
    pub fn row_to_json(&self, row: &[Scalar], format: RowFormat) -> Map<String, Value> {
        self.columns
            .iter()
            .zip(row)
            .map(|(column, value)| {
                let value = match format {
                    RowFormat::Native => value.to_json(),
                    RowFormat::Text => value.to_json_text(),
                };
                (column.clone(), value)
            })
            .collect()
    }
}
