use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::amounts::{resolve_signed_amounts, AmountColumns};
use crate::normalize::{
    drop_artifact_rows, normalize_date_columns, normalize_headers, trim_cells, DATE_COLUMNS,
};
use crate::reader::read_table;
use outlay_core::{categorize, CanonicalMap, CategoryRuleSet, ExpenseRecord, Table};
use outlay_core::{RuleMatch, RuleMiss, RuleSummary};

/// Description-like columns, checked in order against normalized
/// headers.
pub const DESCRIPTION_COLUMNS: [&str; 4] = ["description", "details", "payee", "memo"];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Looked up in the Downloads folder when no input paths are given.
    pub default_filename: String,
    /// Sign-convention threshold passed to the amount resolver.
    pub negative_ratio: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            default_filename: "expenses.csv".to_string(),
            negative_ratio: crate::amounts::DEFAULT_NEGATIVE_RATIO,
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No CSV inputs found. Pass files or folders containing .csv files.")]
    NoInputs,
    #[error("No inputs could be read at all. Check formats and permissions.")]
    AllReadsFailed,
    #[error(
        "No description-like column found (tried {}). Columns present: {}",
        DESCRIPTION_COLUMNS.join(", "),
        .columns.join(", ")
    )]
    NoDescriptionColumn { columns: Vec<String> },
}

/// One input file that failed every read strategy. Recorded, never
/// fatal on its own.
#[derive(Debug, Clone, Serialize)]
pub struct ReadFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Everything one pipeline run produces: the categorized expense
/// table plus the diagnostics of the categorization pass.
#[derive(Debug)]
pub struct PipelineOutput {
    pub records: Vec<ExpenseRecord>,
    pub matches: Vec<RuleMatch>,
    pub misses: Vec<RuleMiss>,
    pub summary: RuleSummary,
    pub failures: Vec<ReadFailure>,
}

/// Run the whole ingestion-normalization-categorization pipeline.
///
/// Empty `paths` falls back to the configured default filename in the
/// user's Downloads folder. Unreadable files are skipped with a
/// warning and recorded in the output; the run only fails when no
/// input resolves at all, when every file is unreadable, or when the
/// combined table has no description-like column.
pub fn run(
    paths: &[PathBuf],
    rules: &CategoryRuleSet,
    canon: &CanonicalMap,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let raw_inputs = if paths.is_empty() {
        default_inputs(config)
    } else {
        paths.to_vec()
    };

    let inputs = expand_inputs(&raw_inputs);
    tracing::info!("{} input file(s) after expansion", inputs.len());
    if inputs.is_empty() {
        return Err(PipelineError::NoInputs);
    }

    let mut tables = Vec::new();
    let mut failures = Vec::new();
    for path in &inputs {
        match read_table(path) {
            Ok(mut table) => {
                drop_artifact_rows(&mut table);
                normalize_headers(&mut table);
                normalize_date_columns(&mut table, &DATE_COLUMNS);
                trim_cells(&mut table);
                tracing::info!("Loaded {} ({} rows)", path.display(), table.len());
                tables.push(table);
            }
            Err(error) => {
                tracing::warn!("Skipped {} ({error})", path.display());
                failures.push(ReadFailure {
                    path: path.clone(),
                    error: error.to_string(),
                });
            }
        }
    }
    if tables.is_empty() {
        return Err(PipelineError::AllReadsFailed);
    }

    let mut table = Table::concat(tables);

    let description_column = table
        .pick_column(&DESCRIPTION_COLUMNS)
        .ok_or_else(|| PipelineError::NoDescriptionColumn {
            columns: table.columns().to_vec(),
        })?
        .to_string();

    let amount_columns = AmountColumns::detect(&table);
    let signed = resolve_signed_amounts(&table, &amount_columns, config.negative_ratio);

    // Keep only expenses: strictly negative signed amounts. Inflows,
    // zeros, and rows with no inferred sign all drop out here.
    let mut kept: Vec<Decimal> = Vec::new();
    table.retain_rows(|i, _| match signed[i] {
        Some(v) if v < Decimal::ZERO => {
            kept.push(v);
            true
        }
        _ => false,
    });

    if let Some(col) = table.column_index(&description_column) {
        table.map_column(col, |cell| clean_description(cell));
    }

    let categorization = categorize(&table, &description_column, rules, canon);

    let date_column = table.pick_column(&DATE_COLUMNS);
    let records = table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let resolved = &categorization.resolved[i];
            ExpenseRecord {
                date: date_column
                    .and_then(|c| table.cell_by_name(i, c))
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_owned),
                description: table
                    .cell_by_name(i, &description_column)
                    .unwrap_or("")
                    .to_string(),
                amount: kept[i],
                category: resolved.group.clone(),
                original_category: resolved.original.clone(),
                group: resolved.group.clone(),
                source: row.source().clone(),
            }
        })
        .collect();

    Ok(PipelineOutput {
        records,
        matches: categorization.matches,
        misses: categorization.misses,
        summary: categorization.summary,
        failures,
    })
}

/// Expand files and folders into a deduplicated list of CSV paths.
/// A leading `~` is expanded to the home directory, directories are
/// walked recursively, and the extension match is case-insensitive.
pub fn expand_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut collected: Vec<PathBuf> = Vec::new();
    for path in paths {
        let path = expand_home(path);
        let path = path.as_path();
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
            {
                if entry.file_type().is_file() && is_csv_filename(entry.path()) {
                    collected.push(entry.into_path());
                }
            }
        } else if is_csv_filename(path) {
            collected.push(path.to_path_buf());
        }
    }

    let mut seen = HashSet::new();
    collected.retain(|p| seen.insert(p.clone()));
    collected
}

/// `~` and `~/…` resolve against the home directory; anything else
/// (including `~user` forms) passes through untouched.
fn expand_home(path: &Path) -> PathBuf {
    let Some(dirs) = directories::UserDirs::new() else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => dirs.home_dir().to_path_buf(),
        Ok(rest) => dirs.home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn is_csv_filename(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

fn default_inputs(config: &PipelineConfig) -> Vec<PathBuf> {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .map(|downloads| vec![downloads.join(&config.default_filename)])
        .unwrap_or_default()
}

fn clean_description(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Serialize)]
struct FailureReport<'a> {
    timestamp: String,
    error: String,
    failures: &'a [ReadFailure],
}

/// Persist a JSON postmortem record for a fatal run. Returns the path
/// written.
pub fn write_failure_report(
    dir: &Path,
    error: &PipelineError,
    failures: &[ReadFailure],
) -> std::io::Result<PathBuf> {
    let now = chrono::Utc::now();
    let report = FailureReport {
        timestamp: now.to_rfc3339(),
        error: error.to_string(),
        failures,
    };
    let path = dir.join(format!(
        "pipeline_failure_{}.json",
        now.format("%Y%m%d_%H%M%S")
    ));
    let body = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
    fs::write(&path, body)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_extension_match_is_case_insensitive() {
        assert!(is_csv_filename(Path::new("a.csv")));
        assert!(is_csv_filename(Path::new("a.CSV")));
        assert!(!is_csv_filename(Path::new("a.txt")));
        assert!(!is_csv_filename(Path::new("csv")));
    }

    #[test]
    fn clean_description_collapses_whitespace() {
        assert_eq!(clean_description("  WHOLE   FOODS\tMKT "), "WHOLE FOODS MKT");
        assert_eq!(clean_description(""), "");
    }

    #[test]
    fn home_prefix_expanded() {
        let Some(dirs) = directories::UserDirs::new() else {
            return;
        };
        let home = dirs.home_dir();
        assert_eq!(
            expand_home(Path::new("~/statements/a.csv")),
            home.join("statements/a.csv")
        );
        assert_eq!(expand_home(Path::new("~")), home.to_path_buf());
        // Only a bare leading "~" component expands.
        assert_eq!(expand_home(Path::new("~user/a.csv")), PathBuf::from("~user/a.csv"));
        assert_eq!(expand_home(Path::new("/abs/a.csv")), PathBuf::from("/abs/a.csv"));
    }

    #[test]
    fn no_description_column_error_lists_columns() {
        let err = PipelineError::NoDescriptionColumn {
            columns: vec!["date".to_string(), "amount".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("description, details, payee, memo"));
        assert!(message.contains("date, amount"));
    }
}
