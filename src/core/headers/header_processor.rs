// Header processing turns the first row of a worksheet into the column names
// that records are keyed by.
//
// Two steps happen in order:
// 1. Optional normalization into SQL-friendly names (`Order #1` -> `order_1`).
// 2. Deduplication, where a repeated name gets the cell address of the
//    duplicate appended (`A`, `B`, `A` -> `A`, `B`, `A_C1`).
//
// Blank header cells never become columns, but they still occupy their
// position so that the indices of the other columns stay aligned with the
// data rows.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Name used when normalization strips a header down to nothing.
const FALLBACK_COLUMN_NAME: &str = "column";

/// Result of running a raw header row through the processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedHeaders {
    /// Final names in column order, including empty placeholders for blank cells.
    pub headers: Vec<String>,
    /// 0-based column index -> final column name. Blank headers are absent.
    pub mapping: ColumnMapping,
}

/// Ordered association from raw column index to final column name.
pub type ColumnMapping = BTreeMap<usize, String>;

impl ProcessedHeaders {
    /// Column names that will appear in records, in column order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.mapping.values().map(String::as_str)
    }
}

fn non_alphanumeric_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static regex is valid"))
}

/// Converts a 0-based column index into its spreadsheet letter (0=A, 25=Z, 26=AA).
pub fn excel_column_label(index: usize) -> String {
    let mut label = String::new();
    let mut n = index + 1;

    while n > 0 {
        n -= 1;
        label.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    label
}

/// Normalizes a header into a SQL-compliant name when `names_conversion` is set.
///
/// Blank names are returned untouched so that blank header cells stay blank
/// and are later dropped from the mapping instead of becoming `column`.
pub fn normalize_column_name(name: &str, names_conversion: bool) -> String {
    if !names_conversion || name.trim().is_empty() {
        return name.to_string();
    }

    let ascii = deunicode::deunicode(name);
    let replaced = non_alphanumeric_runs().replace_all(&ascii, "_");
    let trimmed = replaced.trim_matches('_');

    let mut normalized = String::with_capacity(trimmed.len() + 1);
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        normalized.push('_');
    }
    normalized.push_str(trimmed);
    let normalized = normalized.to_lowercase();

    if normalized.is_empty() {
        FALLBACK_COLUMN_NAME.to_string()
    } else {
        normalized
    }
}

/// Renames repeated headers by appending the duplicate's cell address in row 1.
///
/// Blank headers are placeholders and are never renamed, otherwise a second
/// blank cell would turn into a real column such as `_B1`. A generated name
/// that is itself taken gets a numeric suffix until it is unique.
pub fn deduplicate_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());

    headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            if header.trim().is_empty() {
                return header;
            }

            let name = if seen.contains(&header) {
                let renamed = format!("{}_{}1", header, excel_column_label(idx));
                let mut candidate = renamed.clone();
                let mut suffix = 2;
                while seen.contains(&candidate) {
                    candidate = format!("{}_{}", renamed, suffix);
                    suffix += 1;
                }
                candidate
            } else {
                header
            };

            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Renders a raw header cell as text. Nulls become empty names.
fn header_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Normalizes, deduplicates and maps a raw header row.
pub fn process_headers(raw_headers: &[Value], names_conversion: bool) -> ProcessedHeaders {
    let normalized: Vec<String> = raw_headers
        .iter()
        .map(|cell| normalize_column_name(&header_text(cell), names_conversion))
        .collect();

    let headers = deduplicate_headers(normalized);

    let mapping = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !header.trim().is_empty())
        .map(|(idx, header)| (idx, header.clone()))
        .collect();

    ProcessedHeaders { headers, mapping }
}
