use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::sniff::{sniff_format, SniffedFormat, TextEncoding};
use outlay_core::{Provenance, Table};

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Expected a file, got a directory: {0}")]
    IsDirectory(PathBuf),
    #[error("No rows parsed from {0}")]
    EmptyFile(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Best-effort CSV reader. Strategies are tried in order until one
/// yields rows:
///
/// 1. strict parse with the sniffed dialect (the fast path for
///    well-formed exports);
/// 2. if the file uses CR-only line endings (old Mac exports), rewrite
///    it with normalized endings to a temporary path and retry;
/// 3. manual flexible parse that pads short rows, truncates long ones,
///    and synthesizes `col_1..col_n` headers when none were detected.
///
/// Every row of the returned table carries the file's provenance.
pub fn read_table(path: &Path) -> Result<Table, ReadError> {
    if !path.exists() {
        return Err(ReadError::NotFound(path.to_path_buf()));
    }
    if path.is_dir() {
        return Err(ReadError::IsDirectory(path.to_path_buf()));
    }

    let format = sniff_format(path);
    let raw = fs::read(path)?;
    let source = Provenance::from_path(path);

    if let Some(table) = strict_parse(&raw, format, &source) {
        return Ok(table);
    }

    if raw.contains(&b'\r') && !raw.contains(&b'\n') {
        tracing::warn!(
            "{}: CR-only line endings, rewriting to a temporary file",
            path.display()
        );
        let normalized: Vec<u8> = raw
            .iter()
            .map(|&b| if b == b'\r' { b'\n' } else { b })
            .collect();
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(&normalized)?;
        let rewritten = fs::read(tmp.path())?;
        if let Some(table) = strict_parse(&rewritten, format, &source) {
            return Ok(table);
        }
        return manual_parse(&rewritten, format, &source, path);
    }

    manual_parse(&raw, format, &source, path)
}

fn decode(raw: &[u8], encoding: TextEncoding) -> String {
    // Latin-1 accepts any byte sequence, so a file whose tail is
    // invalid in the sniffed encoding still gets text to parse.
    encoding
        .decode(raw)
        .unwrap_or_else(|| raw.iter().map(|&b| b as char).collect())
}

/// Fast path: dialect-exact parse that rejects ragged rows. `None`
/// on any parse error or an empty file; the caller escalates.
fn strict_parse(raw: &[u8], format: SniffedFormat, source: &Provenance) -> Option<Table> {
    let text = decode(raw, format.encoding);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .quote(format.quote)
        .has_headers(false)
        .flexible(false)
        .from_reader(text.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.ok()?;
        records.push(record.iter().map(str::to_owned).collect());
    }
    build_table(records, format.has_header, source)
}

fn manual_parse(
    raw: &[u8],
    format: SniffedFormat,
    source: &Provenance,
    path: &Path,
) -> Result<Table, ReadError> {
    let text = decode(raw, format.encoding);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .quote(format.quote)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(str::to_owned).collect());
    }
    build_table(records, format.has_header, source)
        .ok_or_else(|| ReadError::EmptyFile(path.to_path_buf()))
}

/// Split header from data (or synthesize a header) and square rows up
/// to the header width. `None` when there are no rows at all.
fn build_table(records: Vec<Vec<String>>, has_header: bool, source: &Provenance) -> Option<Table> {
    if records.is_empty() {
        return None;
    }

    let (columns, data) = if has_header {
        let mut iter = records.into_iter();
        let columns = iter.next()?;
        (columns, iter.collect())
    } else {
        let width = records.iter().map(Vec::len).max().unwrap_or(0);
        let columns = (1..=width).map(|i| format!("col_{i}")).collect();
        (columns, records)
    };

    // Table::from_rows pads short rows and truncates long ones.
    Some(Table::from_rows(columns, data, source.clone()))
}
