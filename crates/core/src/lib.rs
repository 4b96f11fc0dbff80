pub mod canon;
pub mod categorize;
pub mod money;
pub mod record;
pub mod rules;
pub mod summarize;
pub mod table;

pub use canon::{CanonError, CanonicalMap};
pub use categorize::{
    categorize, Categorization, CategoryHits, MissReason, ResolvedCategory, RuleMatch, RuleMiss,
    RuleSummary, UNCATEGORIZED,
};
pub use money::parse_money;
pub use record::ExpenseRecord;
pub use rules::{CategoryRule, CategoryRuleSet, RuleError};
pub use summarize::{per_source_totals, spending_summary, SourceTotals, SpendingSummary, SummaryRow};
pub use table::{Provenance, Row, Table};
