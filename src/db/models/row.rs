//! Best-effort cell accessors for positional spreadsheet rows.
//!
//! Sheets trims trailing empty cells from value ranges, so any index may be missing.
//! Missing or malformed cells decode to empty strings / zero / false instead of failing.

pub type Row = Vec<String>;

pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

pub fn cell_string(row: &[String], idx: usize) -> String {
    cell(row, idx).trim().to_string()
}

pub fn cell_i64(row: &[String], idx: usize) -> i64 {
    cell(row, idx).trim().parse().unwrap_or(0)
}

pub fn cell_opt_i64(row: &[String], idx: usize) -> Option<i64> {
    cell(row, idx).trim().parse().ok()
}

pub fn cell_bool(row: &[String], idx: usize) -> bool {
    matches!(
        cell(row, idx).trim().to_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

pub fn bool_cell(value: bool) -> String {
    let text = if value { "TRUE" } else { "FALSE" };
    text.to_string()
}

pub fn opt_i64_cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
