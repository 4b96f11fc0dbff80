use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Failed to parse rule file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Rule for '{0}' has no keywords")]
    EmptyRule(String),
}

/// One category and the description keywords that trigger it.
/// Keywords are stored uppercased and sorted longest-first, so a more
/// specific substring always pre-empts a generic one ("WHOLE FOODS"
/// beats "FOODS") without any work at scan time.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    category: String,
    keywords: Vec<String>,
}

impl CategoryRule {
    fn new(category: String, keywords: Vec<String>) -> Self {
        let mut keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.trim().to_uppercase())
            .filter(|k| !k.is_empty())
            .collect();
        // Stable sort: equal-length keywords keep their listed order.
        keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));
        CategoryRule { category, keywords }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Ordered keyword rules: the first category whose keyword matches
/// wins, so iteration order is fixed and significant. Built once at
/// startup and passed by reference into categorization; never mutated.
#[derive(Debug, Clone)]
pub struct CategoryRuleSet {
    rules: Vec<CategoryRule>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(rename = "rule")]
    rules: Vec<RuleEntry>,
}

// An array of tables keeps file order; a plain TOML table would not.
#[derive(Debug, Deserialize)]
struct RuleEntry {
    category: String,
    keywords: Vec<String>,
}

impl CategoryRuleSet {
    pub fn new(pairs: Vec<(String, Vec<String>)>) -> Self {
        let rules = pairs
            .into_iter()
            .map(|(category, keywords)| CategoryRule::new(category, keywords))
            .collect();
        CategoryRuleSet { rules }
    }

    /// Load from a TOML file of `[[rule]]` entries, preserving order.
    pub fn from_toml(content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(content)?;
        for entry in &file.rules {
            if entry.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(RuleError::EmptyRule(entry.category.clone()));
            }
        }
        Ok(Self::new(
            file.rules
                .into_iter()
                .map(|e| (e.category, e.keywords))
                .collect(),
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.category.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Scan rules in order against an already-uppercased description.
    /// Returns the winning (category, keyword) pair.
    pub fn find_match(&self, normalized_description: &str) -> Option<(&str, &str)> {
        for rule in &self.rules {
            for keyword in &rule.keywords {
                if normalized_description.contains(keyword.as_str()) {
                    return Some((rule.category.as_str(), keyword.as_str()));
                }
            }
        }
        None
    }

    /// The stock rule set shipped with the pipeline.
    pub fn builtin() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self::new(vec![
            (
                "Car Care".to_string(),
                owned(&["DON MILLER", "MERMAID CAR WASH", "CAR WASH"]),
            ),
            (
                "Coffee".to_string(),
                owned(&["STARBUCKS", "DUNKIN", "PEETS", "COFFEE", "BARRIQUES", "KAFE"]),
            ),
            ("Cash & ATM".to_string(), owned(&["WITHDRAWAL", "ATM"])),
            (
                "Dining".to_string(),
                owned(&[
                    "MCDONALD", "CHIPOTLE", "SUBWAY", "GRUBHUB", "UBER EATS", "DOORDASH",
                    "HMONG", "FOODS",
                ]),
            ),
            (
                "Entertainment".to_string(),
                owned(&["NETFLIX", "HULU", "SPOTIFY", "DISNEY", "YOUTUBE", "PRIME"]),
            ),
            (
                "Gas/Automotive".to_string(),
                owned(&[
                    "ESSO", "SPEEDWAY", "KWIK", "SHELL", "CHEVRON", "BP", "MOBIL", "TEXACO",
                    "SUNOCO", "CITGO", "OIL CHANGE", "CAR WASH", "REPAIR", "MAINTENANCE",
                    "TIRE", "AUTO PARTS", "JIFFY LUBE", "VALVOLINE",
                ]),
            ),
            (
                "Groceries".to_string(),
                owned(&[
                    "SAFEWAY", "KROGER", "WHOLE FOODS", "TRADER JOE", "GROCERY", "WOODMAN",
                    "METRO", "SAMSCLUB", "SAMS CLUB",
                ]),
            ),
            (
                "Humanitarian".to_string(),
                owned(&["GOFUNDME", "DOCTORS W/O BORDER", "ACLU", "DOCTORSWITHOUTBORDERS"]),
            ),
            ("Lodging".to_string(), owned(&["LODGING", "HOTEL", "RESORT"])),
            (
                "Mobile Pay".to_string(),
                owned(&["VENMO", "PAYPAL", "EBAY", "ZELLE"]),
            ),
            (
                "Other_Travel".to_string(),
                owned(&["OTHER TRAVEL", "TRAVEL MISC"]),
            ),
            ("Recreation".to_string(), owned(&["SMOKE", "MARIJUANA"])),
            ("Rent".to_string(), owned(&["SHILTS"])),
            (
                "Shopping".to_string(),
                owned(&["AMAZON", "TARGET", "WALMART", "BEST BUY"]),
            ),
            (
                "Thrifting".to_string(),
                owned(&["ST. VINCENT DE PAUL", "SVDP", "GOODWILL", "SUPERTHRIFT"]),
            ),
            (
                "Transit".to_string(),
                owned(&[
                    "UBER", "LYFT", "METRO", "TRANSIT", "PARKING", "TOLLS", "PRESTO",
                    "TOLLWAY", "PAYGO", "BADGER COACHES",
                ]),
            ),
            (
                "Airfare".to_string(),
                owned(&[
                    "AIRLINE", "DELTA", "UNITED", "AA ", "AMERICAN AIRLINES", "SOUTHWEST",
                    "TRAIN", "AMTRAK", "BUS", "AMERICAN AIR",
                ]),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_sorted_longest_first() {
        let rules = CategoryRuleSet::new(vec![(
            "Groceries".to_string(),
            vec!["FOODS".to_string(), "WHOLE FOODS".to_string()],
        )]);
        let rule = rules.iter().next().unwrap();
        assert_eq!(rule.keywords(), &["WHOLE FOODS", "FOODS"]);
    }

    #[test]
    fn keywords_uppercased_at_construction() {
        let rules = CategoryRuleSet::new(vec![(
            "Coffee".to_string(),
            vec!["starbucks".to_string()],
        )]);
        assert_eq!(
            rules.find_match("STARBUCKS #123"),
            Some(("Coffee", "STARBUCKS"))
        );
    }

    #[test]
    fn first_category_wins() {
        let rules = CategoryRuleSet::new(vec![
            ("A".to_string(), vec!["SHARED".to_string()]),
            ("B".to_string(), vec!["SHARED".to_string()]),
        ]);
        assert_eq!(rules.find_match("SHARED TEXT"), Some(("A", "SHARED")));
    }

    #[test]
    fn longer_keyword_preempts_within_category() {
        let rules = CategoryRuleSet::new(vec![(
            "Groceries".to_string(),
            vec!["FOODS".to_string(), "WHOLE FOODS".to_string()],
        )]);
        assert_eq!(
            rules.find_match("WHOLE FOODS MKT 123"),
            Some(("Groceries", "WHOLE FOODS"))
        );
    }

    #[test]
    fn no_match_returns_none() {
        assert_eq!(CategoryRuleSet::builtin().find_match("ZZZZZZ"), None);
    }

    #[test]
    fn from_toml_preserves_file_order() {
        let content = r#"
            [[rule]]
            category = "Groceries"
            keywords = ["WHOLE FOODS"]

            [[rule]]
            category = "Dining"
            keywords = ["FOODS"]
        "#;
        let rules = CategoryRuleSet::from_toml(content).unwrap();
        let cats: Vec<&str> = rules.categories().collect();
        assert_eq!(cats, vec!["Groceries", "Dining"]);
        assert_eq!(
            rules.find_match("WHOLE FOODS MKT"),
            Some(("Groceries", "WHOLE FOODS"))
        );
    }

    #[test]
    fn from_toml_rejects_keywordless_rule() {
        let content = r#"
            [[rule]]
            category = "Empty"
            keywords = [""]
        "#;
        assert!(matches!(
            CategoryRuleSet::from_toml(content),
            Err(RuleError::EmptyRule(_))
        ));
    }

    #[test]
    fn builtin_is_nonempty_and_ordered() {
        let rules = CategoryRuleSet::builtin();
        assert!(!rules.is_empty());
        let cats: Vec<&str> = rules.categories().collect();
        assert_eq!(cats.first(), Some(&"Car Care"));
        assert_eq!(cats.last(), Some(&"Airfare"));
    }
}
