use chrono::NaiveDate;
use outlay_core::Table;

/// Date-like columns, checked by normalized name in this order.
pub const DATE_COLUMNS: [&str; 3] = ["transaction_date", "posted_date", "date"];

/// Formats tried in order when parsing a date cell. US month-first
/// forms come before day-first so ambiguous slash dates resolve the
/// way the source banks write them.
const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%m/%d/%y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
];

/// Permissive date parsing over the fixed format list.
pub fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Lowercase every column name and collapse interior whitespace runs
/// to single underscores: `"Transaction Date"` → `"transaction_date"`.
pub fn normalize_headers(table: &mut Table) {
    table.rename_columns(|col| {
        col.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    });
}

/// Drop fully-empty rows, then a leading spreadsheet-export artifact
/// row: some apps prepend a row whose only non-empty cell reads
/// "Table 1" (or similar) to their CSV exports.
pub fn drop_artifact_rows(table: &mut Table) {
    table.retain_rows(|_, row| row.cells().iter().any(|c| !c.trim().is_empty()));

    if table.is_empty() {
        return;
    }
    let first = &table.rows()[0];
    let non_empty: Vec<&String> = first.cells().iter().filter(|c| !c.trim().is_empty()).collect();
    if non_empty.len() == 1 && non_empty[0].trim().to_lowercase().starts_with("table ") {
        table.remove_row(0);
    }
}

/// Rewrite parseable cells of each candidate date column as
/// `YYYY-MM-DD`. Unparseable values are left unchanged, and a column
/// that never parses is simply skipped — normalization is never fatal.
pub fn normalize_date_columns(table: &mut Table, candidates: &[&str]) {
    for candidate in candidates {
        if let Some(col) = table.column_index(candidate) {
            table.map_column(col, |cell| match parse_flexible_date(cell) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => cell.to_string(),
            });
        }
    }
}

/// Trim surrounding whitespace from every cell.
pub fn trim_cells(table: &mut Table) {
    table.map_cells(|cell| cell.trim().to_string());
}
