// Cell value coercion.
//
// Every value is emitted as a string except whole-number date serials found
// in columns whose name looks like a date, which become `YYYY-MM-DD`.

use chrono::{Duration, NaiveDate};
use serde_json::Value;

/// Substrings (lowercase) that mark a column as holding dates.
pub const DATE_COLUMN_KEYWORDS: [&str; 8] = [
    "date", "time", "created", "updated", "modified", "expires", "due", "deadline",
];

/// Smallest and largest serial treated as a date.
const MIN_DATE_SERIAL: f64 = 1.0;
const MAX_DATE_SERIAL: f64 = 100_000.0;

/// Serial 60 is Excel's fictitious 1900-02-29.
const PHANTOM_LEAP_DAY_SERIAL: i64 = 60;

fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch literal")
}

/// Decodes an Excel 1900-system date serial into `YYYY-MM-DD`.
pub fn excel_serial_to_date(serial: i64) -> String {
    let days = if serial >= PHANTOM_LEAP_DAY_SERIAL {
        serial - 1
    } else {
        serial
    };

    let date = excel_epoch() + Duration::days(days);
    date.format("%Y-%m-%d").to_string()
}

/// Whether the column name contains one of the date keywords (case-insensitive).
pub fn is_excel_date_column(column_name: &str) -> bool {
    let lower = column_name.to_lowercase();
    DATE_COLUMN_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Text form of a cell value as it is emitted. `None` for nulls.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// True when the cell is null or only whitespace.
pub fn is_blank_cell(value: &Value) -> bool {
    cell_text(value).map_or(true, |text| text.trim().is_empty())
}

fn as_date_serial(value: &Value) -> Option<i64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if (MIN_DATE_SERIAL..=MAX_DATE_SERIAL).contains(&number) && number.fract() == 0.0 {
        Some(number as i64)
    } else {
        None
    }
}

/// Coerces one cell into the value stored in a record.
///
/// Returns `None` when the cell should be left out of the record.
pub fn parse_excel_value(value: &Value, column_name: &str, parse_dates: bool) -> Option<String> {
    let text = cell_text(value)?;
    if text.trim().is_empty() {
        return None;
    }

    if parse_dates && is_excel_date_column(column_name) {
        if let Some(serial) = as_date_serial(value) {
            return Some(excel_serial_to_date(serial));
        }
    }

    Some(text)
}
