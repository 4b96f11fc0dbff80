use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanonError {
    #[error("Invalid remap pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Ordered remap from fine-grained category names to broader groups.
///
/// Patterns are case-insensitive and anchored to the whole category
/// string; the first matching pattern's replacement wins and the remap
/// is applied exactly once, never recursively. Unmatched categories
/// pass through unchanged. Applied only to resolved category labels,
/// never to raw descriptions.
#[derive(Debug, Clone)]
pub struct CanonicalMap {
    entries: Vec<(Regex, String)>,
}

impl CanonicalMap {
    /// Build from (pattern, group) pairs. Each pattern is compiled
    /// case-insensitive and anchored with `^\s*…\s*$` so stray
    /// whitespace around a label still matches.
    pub fn new(pairs: Vec<(String, String)>) -> Result<Self, CanonError> {
        let mut entries = Vec::with_capacity(pairs.len());
        for (pattern, group) in pairs {
            let anchored = format!(r"^\s*(?:{pattern})\s*$");
            let regex = RegexBuilder::new(&anchored)
                .case_insensitive(true)
                .build()
                .map_err(|source| CanonError::BadPattern { pattern, source })?;
            entries.push((regex, group));
        }
        Ok(CanonicalMap { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a resolved category to its canonical group.
    pub fn apply(&self, category: &str) -> String {
        for (regex, group) in &self.entries {
            if regex.is_match(category) {
                return group.clone();
            }
        }
        category.to_string()
    }

    /// The stock remap: travel-ish categories into "Travel", everyday
    /// spending into "Household".
    pub fn builtin() -> Self {
        let pairs = [
            ("lodging", "Travel"),
            ("airfare", "Travel"),
            (r"other[_\s]*travel", "Travel"),
            (r"gas[_\s]*/[_\s]*automotive", "Travel"),
            ("coffee", "Household"),
            (r"dining[_\s]*out", "Household"),
            ("dining", "Household"),
            ("groceries", "Household"),
            (r"food & dining", "Household"),
            ("shopping", "Household"),
            ("pharmacy", "Household"),
            ("merchandise", "Household"),
        ];
        // Patterns above are fixed literals; compilation cannot fail.
        Self::new(
            pairs
                .iter()
                .map(|(p, g)| (p.to_string(), g.to_string()))
                .collect(),
        )
        .unwrap_or(CanonicalMap { entries: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaps_whole_string_case_insensitive() {
        let map = CanonicalMap::builtin();
        assert_eq!(map.apply("Lodging"), "Travel");
        assert_eq!(map.apply("LODGING"), "Travel");
        assert_eq!(map.apply("  lodging  "), "Travel");
    }

    #[test]
    fn substring_does_not_match() {
        let map = CanonicalMap::builtin();
        assert_eq!(map.apply("Lodging Fees"), "Lodging Fees");
    }

    #[test]
    fn unmatched_passes_through() {
        let map = CanonicalMap::builtin();
        assert_eq!(map.apply("Rent"), "Rent");
        assert_eq!(map.apply("Uncategorized"), "Uncategorized");
    }

    #[test]
    fn first_pattern_wins() {
        let map = CanonicalMap::new(vec![
            ("coffee".to_string(), "Household".to_string()),
            ("coffee".to_string(), "Other".to_string()),
        ])
        .unwrap();
        assert_eq!(map.apply("Coffee"), "Household");
    }

    #[test]
    fn applied_once_not_recursively() {
        // "A" maps to "B" and "B" maps to "C"; a single application of
        // "A" must stop at "B".
        let map = CanonicalMap::new(vec![
            ("a".to_string(), "B".to_string()),
            ("b".to_string(), "C".to_string()),
        ])
        .unwrap();
        assert_eq!(map.apply("A"), "B");
    }

    #[test]
    fn separator_variants_in_builtin() {
        let map = CanonicalMap::builtin();
        assert_eq!(map.apply("Gas/Automotive"), "Travel");
        assert_eq!(map.apply("Other_Travel"), "Travel");
        assert_eq!(map.apply("other travel"), "Travel");
        assert_eq!(map.apply("Food & Dining"), "Household");
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = CanonicalMap::new(vec![("(".to_string(), "X".to_string())]);
        assert!(matches!(err, Err(CanonError::BadPattern { .. })));
    }
}
