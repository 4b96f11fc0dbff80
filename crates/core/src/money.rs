use rust_decimal::Decimal;
use std::str::FromStr;

/// Coerce a bank-export currency string to a number.
///
/// Handles the formats that show up in real exports: a leading `$`,
/// thousands separators, and accounting-style parentheses for
/// negatives (`"(1,234.50)"` → `-1234.50`). Blank or unparseable
/// values become `None`, the tabular stand-in for NaN.
pub fn parse_money(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let (negated, s) = if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };

    let cleaned = s.replace(['$', ','], "");
    let value = Decimal::from_str(cleaned.trim()).ok()?;
    Some(if negated { -value } else { value })
}
