use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which input file a row came from: the (directory, filename) pair.
/// Assigned when the row is built and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    pub dir: String,
    pub file: String,
}

impl Provenance {
    pub fn from_path(path: &Path) -> Self {
        Provenance {
            dir: path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            file: path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    cells: Vec<String>,
    source: Provenance,
}

impl Row {
    pub fn new(cells: Vec<String>, source: Provenance) -> Self {
        Row { cells, source }
    }

    pub fn source(&self) -> &Provenance {
        &self.source
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// In-memory tabular structure: named columns over string cells.
/// The empty string models a missing value, which is how a padded or
/// absent CSV field arrives anyway.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table for one source file. Every row gets the same
    /// provenance; short rows are padded and long rows truncated to the
    /// column count.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>, source: Provenance) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, String::new());
                Row::new(cells, source.clone())
            })
            .collect();
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// First candidate that names an existing column.
    pub fn pick_column<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().find(|c| self.has_column(c))
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        &self.rows[row].cells[col]
    }

    pub fn cell_by_name(&self, row: usize, name: &str) -> Option<&str> {
        self.column_index(name).map(|c| self.cell(row, c))
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: String) {
        self.rows[row].cells[col] = value;
    }

    /// Rewrite every cell in place.
    pub fn map_cells(&mut self, f: impl Fn(&str) -> String) {
        for row in &mut self.rows {
            for cell in &mut row.cells {
                *cell = f(cell);
            }
        }
    }

    /// Rewrite one column in place.
    pub fn map_column(&mut self, col: usize, f: impl Fn(&str) -> String) {
        for row in &mut self.rows {
            row.cells[col] = f(&row.cells[col]);
        }
    }

    pub fn rename_columns(&mut self, f: impl Fn(&str) -> String) {
        for col in &mut self.columns {
            *col = f(col);
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(usize, &Row) -> bool) {
        let mut idx = 0;
        self.rows.retain(|row| {
            let keep_it = keep(idx, row);
            idx += 1;
            keep_it
        });
    }

    pub fn remove_row(&mut self, idx: usize) {
        self.rows.remove(idx);
    }

    /// Concatenate tables from several source files. Columns are
    /// unioned in first-seen order; cells absent from a source file
    /// stay empty. Row provenance carries over unchanged.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for col in &table.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            // Map this table's cells into the union layout.
            let indices: Vec<usize> = table
                .columns
                .iter()
                .map(|c| columns.iter().position(|u| u == c).unwrap_or(usize::MAX))
                .collect();
            for row in table.rows {
                let mut cells = vec![String::new(); columns.len()];
                for (src_idx, dst_idx) in indices.iter().enumerate() {
                    if *dst_idx != usize::MAX {
                        cells[*dst_idx] = row.cells[src_idx].clone();
                    }
                }
                rows.push(Row::new(cells, row.source));
            }
        }

        Table { columns, rows }
    }
}
