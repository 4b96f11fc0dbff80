use serde::Serialize;
use std::fmt;

use crate::canon::CanonicalMap;
use crate::rules::CategoryRuleSet;
use crate::table::{Provenance, Table};

/// Pre-existing category columns some exports already carry, checked
/// in this order when no keyword rule fires.
pub const EXISTING_CATEGORY_COLUMNS: [&str; 4] = ["category", "categories", "cat", "type"];

/// Label assigned when neither a rule nor an existing value resolves.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One successful keyword-rule hit.
#[derive(Debug, Clone, Serialize)]
pub struct RuleMatch {
    pub source: Provenance,
    pub row_index: usize,
    pub description: String,
    pub matched_category: String,
    pub matched_keyword: String,
    pub final_category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    EmptyDescription,
    NoKeywordMatch,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::EmptyDescription => write!(f, "empty_description"),
            MissReason::NoKeywordMatch => write!(f, "no_keyword_match"),
        }
    }
}

/// One row no keyword rule matched, with how it was resolved anyway.
#[derive(Debug, Clone, Serialize)]
pub struct RuleMiss {
    pub source: Provenance,
    pub row_index: usize,
    pub description: String,
    pub existing_category: Option<String>,
    pub final_category: String,
    pub reason: MissReason,
}

/// Hit count for one rule category. Zero-hit categories are listed too.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryHits {
    pub category: String,
    pub rule_hits: usize,
}

/// Per-run coverage summary for one categorization pass.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    /// Hits per category, in rule-set order, zero-hit entries included.
    pub hits: Vec<CategoryHits>,
    pub total_rows: usize,
    /// matched rows / total rows × 100, rounded to two decimals.
    pub rule_coverage_pct: f64,
}

/// Per-row labels produced by one pass.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedCategory {
    /// Label before the canonical remap.
    pub original: String,
    /// Label after the canonical remap.
    pub group: String,
    /// Keyword that matched, when a rule fired.
    pub matched_keyword: Option<String>,
}

/// Immutable snapshot of one categorization pass.
#[derive(Debug, Clone)]
pub struct Categorization {
    pub resolved: Vec<ResolvedCategory>,
    pub matches: Vec<RuleMatch>,
    pub misses: Vec<RuleMiss>,
    pub summary: RuleSummary,
}

/// Resolve a category for every row of `table`.
///
/// Per row: uppercase the description, scan the rule set in its fixed
/// order (keywords longest-first within each category), and take the
/// first keyword that is a substring. Rows without a hit fall back to
/// the first non-blank pre-existing category cell, then to
/// `Uncategorized`. The canonical remap is applied to the resolved
/// label afterwards. No I/O, no failure mode: identical inputs always
/// produce identical outputs.
pub fn categorize(
    table: &Table,
    description_column: &str,
    rules: &CategoryRuleSet,
    canon: &CanonicalMap,
) -> Categorization {
    let desc_idx = table.column_index(description_column);
    let existing_idx: Vec<usize> = EXISTING_CATEGORY_COLUMNS
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();

    let mut resolved = Vec::with_capacity(table.len());
    let mut matches = Vec::new();
    let mut misses = Vec::new();

    for (row_index, row) in table.rows().iter().enumerate() {
        let description = desc_idx.map(|c| row.cells()[c].as_str()).unwrap_or("");
        let normalized = description.to_uppercase();

        let hit = if normalized.trim().is_empty() {
            None
        } else {
            rules.find_match(&normalized)
        };

        let existing = existing_idx
            .iter()
            .map(|&c| row.cells()[c].trim())
            .find(|v| !v.is_empty())
            .map(|v| v.to_string());

        let original = match (&hit, &existing) {
            (Some((category, _)), _) => (*category).to_string(),
            (None, Some(value)) => value.clone(),
            (None, None) => UNCATEGORIZED.to_string(),
        };
        let group = canon.apply(&original);

        match hit {
            Some((category, keyword)) => {
                matches.push(RuleMatch {
                    source: row.source().clone(),
                    row_index,
                    description: description.to_string(),
                    matched_category: category.to_string(),
                    matched_keyword: keyword.to_string(),
                    final_category: group.clone(),
                });
            }
            None => {
                let reason = if description.trim().is_empty() {
                    MissReason::EmptyDescription
                } else {
                    MissReason::NoKeywordMatch
                };
                misses.push(RuleMiss {
                    source: row.source().clone(),
                    row_index,
                    description: description.to_string(),
                    existing_category: existing.clone(),
                    final_category: group.clone(),
                    reason,
                });
            }
        }

        resolved.push(ResolvedCategory {
            original,
            group,
            matched_keyword: hit.map(|(_, kw)| kw.to_string()),
        });
    }

    let summary = summarize_hits(rules, &matches, table.len());

    Categorization {
        resolved,
        matches,
        misses,
        summary,
    }
}

fn summarize_hits(rules: &CategoryRuleSet, matches: &[RuleMatch], total_rows: usize) -> RuleSummary {
    let hits = rules
        .categories()
        .map(|category| CategoryHits {
            category: category.to_string(),
            rule_hits: matches
                .iter()
                .filter(|m| m.matched_category == category)
                .count(),
        })
        .collect();

    let coverage = if total_rows == 0 {
        0.0
    } else {
        matches.len() as f64 / total_rows as f64 * 100.0
    };

    RuleSummary {
        hits,
        total_rows,
        rule_coverage_pct: (coverage * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Provenance;

    fn src() -> Provenance {
        Provenance {
            dir: "/in".to_string(),
            file: "test.csv".to_string(),
        }
    }

    fn desc_table(descriptions: &[&str]) -> Table {
        Table::from_rows(
            vec!["description".into()],
            descriptions
                .iter()
                .map(|d| vec![d.to_string()])
                .collect(),
            src(),
        )
    }

    fn grocery_rules() -> CategoryRuleSet {
        CategoryRuleSet::new(vec![
            (
                "Groceries".to_string(),
                vec!["WHOLE FOODS".to_string(), "SAFEWAY".to_string()],
            ),
            ("Dining".to_string(), vec!["FOODS".to_string()]),
        ])
    }

    #[test]
    fn whole_foods_resolves_to_groceries() {
        let table = desc_table(&["WHOLE FOODS MKT 123"]);
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.resolved[0].original, "Groceries");
        assert_eq!(out.matches[0].matched_keyword, "WHOLE FOODS");
    }

    #[test]
    fn canon_applies_to_resolved_label() {
        let table = desc_table(&["WHOLE FOODS MKT 123"]);
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.resolved[0].group, "Household");
        assert_eq!(out.matches[0].final_category, "Household");
    }

    #[test]
    fn matching_is_case_insensitive_via_uppercasing() {
        let table = desc_table(&["whole foods mkt"]);
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.resolved[0].original, "Groceries");
    }

    #[test]
    fn falls_back_to_existing_category_column() {
        let table = Table::from_rows(
            vec!["description".into(), "category".into()],
            vec![vec!["MYSTERY VENDOR".into(), "Utilities".into()]],
            src(),
        );
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.resolved[0].original, "Utilities");
        assert_eq!(out.misses[0].existing_category.as_deref(), Some("Utilities"));
        assert_eq!(out.misses[0].reason, MissReason::NoKeywordMatch);
    }

    #[test]
    fn existing_column_priority_is_fixed() {
        // "category" outranks "type" even when both are present.
        let table = Table::from_rows(
            vec!["description".into(), "type".into(), "category".into()],
            vec![vec!["MYSTERY".into(), "Fee".into(), "Utilities".into()]],
            src(),
        );
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.resolved[0].original, "Utilities");
    }

    #[test]
    fn unresolvable_row_is_uncategorized() {
        let table = desc_table(&["MYSTERY VENDOR"]);
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.resolved[0].original, UNCATEGORIZED);
        assert_eq!(out.resolved[0].group, UNCATEGORIZED);
    }

    #[test]
    fn blank_description_miss_reason() {
        let table = desc_table(&["", "   "]);
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.misses.len(), 2);
        assert!(out
            .misses
            .iter()
            .all(|m| m.reason == MissReason::EmptyDescription));
    }

    #[test]
    fn summary_lists_zero_hit_categories() {
        let table = desc_table(&["SAFEWAY STORE 1"]);
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.summary.hits.len(), 2);
        assert_eq!(out.summary.hits[0].category, "Groceries");
        assert_eq!(out.summary.hits[0].rule_hits, 1);
        assert_eq!(out.summary.hits[1].category, "Dining");
        assert_eq!(out.summary.hits[1].rule_hits, 0);
    }

    #[test]
    fn coverage_is_percentage_rounded_to_two_decimals() {
        let mut descriptions = vec!["SAFEWAY"; 7];
        descriptions.extend(["MYSTERY"; 3]);
        let table = desc_table(&descriptions);
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.summary.total_rows, 10);
        assert_eq!(out.summary.rule_coverage_pct, 70.0);
    }

    #[test]
    fn coverage_of_empty_table_is_zero() {
        let table = desc_table(&[]);
        let out = categorize(&table, "description", &grocery_rules(), &CanonicalMap::builtin());
        assert_eq!(out.summary.rule_coverage_pct, 0.0);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let table = desc_table(&["WHOLE FOODS", "MYSTERY", "", "STARBUCKS COFFEE"]);
        let rules = CategoryRuleSet::builtin();
        let canon = CanonicalMap::builtin();
        let a = categorize(&table, "description", &rules, &canon);
        let b = categorize(&table, "description", &rules, &canon);
        let labels = |c: &Categorization| {
            c.resolved
                .iter()
                .map(|r| (r.original.clone(), r.group.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(labels(&a), labels(&b));
        assert_eq!(a.matches.len(), b.matches.len());
        assert_eq!(a.misses.len(), b.misses.len());
        assert_eq!(a.summary.rule_coverage_pct, b.summary.rule_coverage_pct);
    }
}
