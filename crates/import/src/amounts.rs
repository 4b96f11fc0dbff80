use rust_decimal::Decimal;

use outlay_core::{parse_money, Provenance, Table};

/// Column-name candidates, checked in order against normalized headers.
pub const DEBIT_COLUMNS: [&str; 3] = ["debit", "withdrawal", "outflow"];
pub const CREDIT_COLUMNS: [&str; 3] = ["credit", "deposit", "inflow"];
pub const AMOUNT_COLUMNS: [&str; 4] = ["amount", "amt", "value", "transaction_amount"];

/// Share of the positive-value count that negatives must reach before
/// a single amount column is read as "negative = expense". Below it,
/// the file is assumed to encode expenses as positives and the sign is
/// flipped. This is a heuristic carried over from observed bank
/// exports, not a guaranteed classifier; it is configurable for a
/// reason.
pub const DEFAULT_NEGATIVE_RATIO: f64 = 0.2;

/// The amount-bearing columns found in a combined table.
#[derive(Debug, Clone, Default)]
pub struct AmountColumns {
    pub debit: Option<String>,
    pub credit: Option<String>,
    pub amount: Option<String>,
}

impl AmountColumns {
    pub fn detect(table: &Table) -> Self {
        AmountColumns {
            debit: table.pick_column(&DEBIT_COLUMNS).map(str::to_owned),
            credit: table.pick_column(&CREDIT_COLUMNS).map(str::to_owned),
            amount: table.pick_column(&AMOUNT_COLUMNS).map(str::to_owned),
        }
    }
}

/// Produce one signed amount per row (negative = expense), inferring
/// the sign convention independently for each source file.
///
/// Per provenance group, in priority order:
/// 1. a debit column with data — debits are always expenses, negate;
/// 2. an amount column with data — keep negatives when they reach the
///    ratio threshold against positives, otherwise flip positives;
/// 3. a credit column only — inflow-only source, all zero;
/// 4. nothing usable — all missing, filtered out downstream.
pub fn resolve_signed_amounts(
    table: &Table,
    columns: &AmountColumns,
    negative_ratio: f64,
) -> Vec<Option<Decimal>> {
    let debit_idx = columns.debit.as_deref().and_then(|c| table.column_index(c));
    let credit_idx = columns.credit.as_deref().and_then(|c| table.column_index(c));
    let amount_idx = columns.amount.as_deref().and_then(|c| table.column_index(c));

    let mut signed: Vec<Option<Decimal>> = vec![None; table.len()];

    for (source, rows) in partition_by_source(table) {
        let has_data = |col: Option<usize>| {
            col.is_some_and(|c| rows.iter().any(|&i| !table.cell(i, c).trim().is_empty()))
        };

        if has_data(debit_idx) {
            let col = debit_idx.unwrap_or_default();
            for &i in &rows {
                let cell = table.cell(i, col).trim();
                signed[i] = if cell.is_empty() {
                    Some(Decimal::ZERO)
                } else {
                    parse_money(cell).map(|v| -v)
                };
            }
            tracing::info!("{}: debit column, negating (debits = expenses)", source.file);
        } else if has_data(amount_idx) {
            let col = amount_idx.unwrap_or_default();
            let values: Vec<Option<Decimal>> =
                rows.iter().map(|&i| parse_money(table.cell(i, col))).collect();
            let negatives = values.iter().flatten().filter(|v| v.is_sign_negative() && !v.is_zero()).count();
            let positives = values.iter().flatten().filter(|v| v.is_sign_positive() && !v.is_zero()).count();
            let threshold = ((negative_ratio * positives.max(1) as f64).trunc() as usize).max(1);

            if negatives >= threshold {
                for (&i, value) in rows.iter().zip(&values) {
                    signed[i] = Some(match value {
                        Some(v) if v.is_sign_negative() && !v.is_zero() => *v,
                        _ => Decimal::ZERO,
                    });
                }
                tracing::info!(
                    "{}: amount column, negatives = expenses (neg={negatives}, pos={positives})",
                    source.file
                );
            } else {
                for (&i, value) in rows.iter().zip(&values) {
                    signed[i] = Some(match value {
                        Some(v) if v.is_sign_positive() && !v.is_zero() => -*v,
                        _ => Decimal::ZERO,
                    });
                }
                tracing::info!(
                    "{}: amount column, positives = expenses, flipping (neg={negatives}, pos={positives})",
                    source.file
                );
            }
        } else if has_data(credit_idx) {
            // Inflow-only source: nothing here counts as an expense.
            for &i in &rows {
                signed[i] = Some(Decimal::ZERO);
            }
            tracing::info!("{}: only credit data present, no expenses inferred", source.file);
        } else {
            tracing::warn!("{}: no usable amount column, leaving rows unsigned", source.file);
        }
    }

    signed
}

/// Row indices per provenance, in first-seen order.
fn partition_by_source(table: &Table) -> Vec<(Provenance, Vec<usize>)> {
    let mut groups: Vec<(Provenance, Vec<usize>)> = Vec::new();
    for (i, row) in table.rows().iter().enumerate() {
        match groups.iter_mut().find(|(p, _)| p == row.source()) {
            Some((_, rows)) => rows.push(i),
            None => groups.push((row.source().clone(), vec![i])),
        }
    }
    groups
}
