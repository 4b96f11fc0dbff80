use rust_decimal::Decimal;
use serde::Serialize;

use crate::table::Provenance;

/// One categorized expense row: the pipeline's typed output, consumed
/// by whatever aggregation or reporting layer sits downstream.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRecord {
    /// Normalized date (`YYYY-MM-DD`) when one could be parsed, the
    /// original text otherwise, `None` when no date column existed.
    pub date: Option<String>,
    /// Description with collapsed interior whitespace.
    pub description: String,
    /// Signed amount; always negative here, since only expense rows
    /// survive the pipeline's filter.
    pub amount: Decimal,
    /// Final label, after the canonical remap.
    pub category: String,
    /// Resolved label before the canonical remap.
    pub original_category: String,
    /// Canonical group the label was remapped into. Equal to
    /// `category` today, but downstream consumers read them as
    /// separate columns.
    pub group: String,
    pub source: Provenance,
}
