use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::record::ExpenseRecord;
use crate::table::Provenance;

/// Aggregated spend for one (group, category, description) triple.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub group: String,
    pub category: String,
    pub description: String,
    pub count: usize,
    pub total_amount: Decimal,
}

/// Flat summary table with a grand total, sorted by group, then
/// category, then total (largest spend first — amounts are negative,
/// so ascending), then description.
#[derive(Debug, Clone, Serialize)]
pub struct SpendingSummary {
    pub rows: Vec<SummaryRow>,
    pub total_count: usize,
    pub total_amount: Decimal,
}

pub fn spending_summary(records: &[ExpenseRecord]) -> SpendingSummary {
    let mut buckets: BTreeMap<(String, String, String), (usize, Decimal)> = BTreeMap::new();
    for record in records {
        let key = (
            record.group.clone(),
            record.original_category.clone(),
            record.description.clone(),
        );
        let entry = buckets.entry(key).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += record.amount;
    }

    let mut rows: Vec<SummaryRow> = buckets
        .into_iter()
        .map(|((group, category, description), (count, total_amount))| SummaryRow {
            group,
            category,
            description,
            count,
            total_amount,
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.group, &a.category)
            .cmp(&(&b.group, &b.category))
            .then(a.total_amount.cmp(&b.total_amount))
            .then(a.description.cmp(&b.description))
    });

    SpendingSummary {
        total_count: rows.iter().map(|r| r.count).sum(),
        total_amount: rows.iter().map(|r| r.total_amount).sum(),
        rows,
    }
}

/// Row count and spend total per input file, heaviest files first
/// within each directory.
#[derive(Debug, Clone, Serialize)]
pub struct SourceTotals {
    pub source: Provenance,
    pub rows: usize,
    pub total_amount: Decimal,
}

pub fn per_source_totals(records: &[ExpenseRecord]) -> Vec<SourceTotals> {
    let mut buckets: BTreeMap<(String, String), (usize, Decimal)> = BTreeMap::new();
    for record in records {
        let key = (record.source.dir.clone(), record.source.file.clone());
        let entry = buckets.entry(key).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += record.amount;
    }

    let mut totals: Vec<SourceTotals> = buckets
        .into_iter()
        .map(|((dir, file), (rows, total_amount))| SourceTotals {
            source: Provenance { dir, file },
            rows,
            total_amount,
        })
        .collect();
    totals.sort_by(|a, b| {
        a.source
            .dir
            .cmp(&b.source.dir)
            .then(b.rows.cmp(&a.rows))
            .then(a.source.file.cmp(&b.source.file))
    });
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn record(desc: &str, amount: &str, category: &str, group: &str, file: &str) -> ExpenseRecord {
        ExpenseRecord {
            date: None,
            description: desc.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            category: group.to_string(),
            original_category: category.to_string(),
            group: group.to_string(),
            source: Provenance {
                dir: "/in".to_string(),
                file: file.to_string(),
            },
        }
    }

    #[test]
    fn summary_groups_and_totals() {
        let records = vec![
            record("WHOLE FOODS", "-10", "Groceries", "Household", "a.csv"),
            record("WHOLE FOODS", "-20", "Groceries", "Household", "b.csv"),
            record("DELTA AIR", "-300", "Airfare", "Travel", "a.csv"),
        ];
        let summary = spending_summary(&records);
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.total_amount, Decimal::from_str("-330").unwrap());

        let wf = summary
            .rows
            .iter()
            .find(|r| r.description == "WHOLE FOODS")
            .unwrap();
        assert_eq!(wf.count, 2);
        assert_eq!(wf.total_amount, Decimal::from_str("-30").unwrap());
    }

    #[test]
    fn summary_sorts_biggest_spend_first_within_category() {
        let records = vec![
            record("SMALL", "-1", "Groceries", "Household", "a.csv"),
            record("BIG", "-100", "Groceries", "Household", "a.csv"),
        ];
        let summary = spending_summary(&records);
        assert_eq!(summary.rows[0].description, "BIG");
        assert_eq!(summary.rows[1].description, "SMALL");
    }

    #[test]
    fn per_source_counts_rows() {
        let records = vec![
            record("X", "-1", "Groceries", "Household", "a.csv"),
            record("Y", "-2", "Groceries", "Household", "a.csv"),
            record("Z", "-3", "Groceries", "Household", "b.csv"),
        ];
        let totals = per_source_totals(&records);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].source.file, "a.csv");
        assert_eq!(totals[0].rows, 2);
        assert_eq!(totals[1].total_amount, Decimal::from_str("-3").unwrap());
    }
}
