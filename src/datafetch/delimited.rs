//! CSV parsing with per-column type inference.

use super::types::Scalar;
use super::DataFetchError;
use std::collections::HashMap;

/// Cell contents treated as missing values.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: &str) -> bool {
    NA_VALUES.contains(&cell)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Narrowest kind every non-missing cell of the column fits into.
/// An all-missing column stays `Text`.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut int = true;
    let mut float = true;
    let mut boolean = true;
    let mut any = false;

    for cell in cells.filter(|c| !is_missing(c)) {
        any = true;
        let cell = cell.trim();
        if int && cell.parse::<i64>().is_err() {
            int = false;
        }
        if float && cell.parse::<f64>().is_err() {
            float = false;
        }
        if boolean && parse_bool(cell).is_none() {
            boolean = false;
        }
        if !int && !float && !boolean {
            return ColumnKind::Text;
        }
    }

    match (any, int, float, boolean) {
        (false, ..) => ColumnKind::Text,
        (true, true, _, _) => ColumnKind::Int,
        (true, _, true, _) => ColumnKind::Float,
        (true, _, _, true) => ColumnKind::Bool,
        _ => ColumnKind::Text,
    }
}

fn convert(cell: &str, kind: ColumnKind) -> Scalar {
    if is_missing(cell) {
        return Scalar::Null;
    }
    let trimmed = cell.trim();
    match kind {
        ColumnKind::Int => trimmed.parse().map(Scalar::Int).unwrap_or(Scalar::Null),
        ColumnKind::Float => trimmed.parse().map(Scalar::Float).unwrap_or(Scalar::Null),
        ColumnKind::Bool => parse_bool(trimmed).map(Scalar::Bool).unwrap_or(Scalar::Null),
        ColumnKind::Text => Scalar::Text(cell.to_string()),
    }
}

/// Fill blank header cells and disambiguate repeated ones (`a`, `a.1`, `a.2`).
pub(crate) fn normalize_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::new();

    for (index, header) in raw.into_iter().enumerate() {
        let header = header.trim().to_string();
        let base = if header.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header
        };

        let mut name = base.clone();
        while let Some(count) = seen.get_mut(&name) {
            *count += 1;
            name = format!("{}.{}", base, count);
        }
        seen.insert(name.clone(), 0);
        headers.push(name);
    }

    headers
}

/// Parse CSV bytes into columns and typed rows. The first record is the header.
pub fn parse_csv(
    file: &str,
    bytes: &[u8],
) -> Result<(Vec<String>, Vec<Vec<Scalar>>), DataFetchError> {
    // Excel-exported CSVs often start with a UTF-8 BOM
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| DataFetchError::parse(file, e))?
        .iter()
        .map(str::to_string);
    let columns = normalize_headers(headers);

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataFetchError::parse(file, e))?;
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(columns.len(), String::new());
        records.push(cells);
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|i| infer_kind(records.iter().map(|r| r[i].as_str())))
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&kinds)
                .map(|(cell, kind)| convert(cell, *kind))
                .collect()
        })
        .collect();

    Ok((columns, rows))
}
