//! Excel workbook parsing (first worksheet only).

use super::delimited::normalize_headers;
use super::types::Scalar;
use super::DataFetchError;
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use std::io::Cursor;

/// Largest float that still converts to `i64` without losing digits.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// ISO-8601 text for date cells; durations and out-of-range serials keep the
/// raw serial number.
fn datetime_text(value: &ExcelDateTime) -> String {
    match value.as_datetime() {
        Some(dt) if value.is_datetime() => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        _ => value.as_f64().to_string(),
    }
}

fn to_scalar(cell: &Data) -> Scalar {
    match cell {
        Data::Empty | Data::Error(_) => Scalar::Null,
        Data::Int(i) => Scalar::Int(*i),
        // xlsx stores every number as a double
        Data::Float(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INT => Scalar::Int(*f as i64),
        Data::Float(f) => Scalar::Float(*f),
        Data::Bool(b) => Scalar::Bool(*b),
        Data::String(s) if s.is_empty() => Scalar::Null,
        Data::String(s) => Scalar::Text(s.clone()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Scalar::Text(s.clone()),
        Data::DateTime(value) => Scalar::Text(datetime_text(value)),
    }
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

/// Parse `.xlsx`/`.xls` bytes. The first row of the first worksheet is the header.
pub fn parse_workbook(
    file: &str,
    bytes: Vec<u8>,
) -> Result<(Vec<String>, Vec<Vec<Scalar>>), DataFetchError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| DataFetchError::parse(file, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataFetchError::parse(file, "workbook has no worksheets"))?
        .map_err(|e| DataFetchError::parse(file, e))?;

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header) => normalize_headers(header.iter().map(header_name)),
        None => Vec::new(),
    };

    let rows = rows
        .map(|row| row.iter().map(to_scalar).collect())
        .collect();

    Ok((columns, rows))
}
