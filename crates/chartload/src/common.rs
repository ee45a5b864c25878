//! 📦 Common data structures: the building blocks of chartload.
//!
//! 🎬 COLD OPEN: INT. WAREHOUSE LOADING DOCK, 3:47 AM
//!
//! A forklift idles. Three pallets arrive: one stamped SHAZAM, one LASTFM,
//! one SPOTIFY. They were packed by three different vendors who have never
//! met and never will. The dock worker doesn't care. The dock worker only
//! accepts `Table`s.
//!
//! A [`Table`] is the one shape every source gets hammered into before the
//! warehouse will talk to it: ordered column names, rows of nullable text
//! cells. No types, no opinions. The warehouse owns the types. 🦆

/// 🧱 One cell. `None` is SQL NULL, pandas NaN, or "that file didn't have this column".
pub type Cell = Option<String>;

/// 📊 A flat table: ordered columns, unordered rows.
///
/// Invariant: every row has exactly `columns.len()` cells. All mutation goes
/// through methods that keep it that way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// 🏗️ A table with columns and no rows yet.
    pub(crate) fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 🔎 Every value of one column, in row order. `None` if the column doesn't exist.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_deref()).collect())
    }

    /// ➕ Append a row. Short rows are padded with NULLs, long rows are truncated.
    pub(crate) fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// ➕ Append a row given as (column, value) pairs. Columns seen for the first
    /// time are added to the end and back-filled with NULL for earlier rows.
    pub(crate) fn push_record<I>(&mut self, record: I)
    where
        I: IntoIterator<Item = (String, Cell)>,
    {
        let mut row = vec![None; self.columns.len()];
        for (column, value) in record {
            let idx = match self.column_index(&column) {
                Some(idx) => idx,
                None => {
                    self.add_column(column);
                    row.push(None);
                    self.columns.len() - 1
                }
            };
            row[idx] = value;
        }
        self.rows.push(row);
    }

    fn add_column(&mut self, column: String) {
        self.columns.push(column);
        for row in &mut self.rows {
            row.push(None);
        }
    }

    /// 🧵 Row-wise concatenation. Columns are the union of both sides in order of
    /// first appearance; cells a side didn't have become NULL.
    pub(crate) fn concat(mut self, other: Table) -> Table {
        if self.columns.is_empty() && self.rows.is_empty() {
            return other;
        }
        for column in &other.columns {
            if self.column_index(column).is_none() {
                self.add_column(column.clone());
            }
        }
        // -- 🗺️ where each of `other`'s columns landed in `self`
        let mapping: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        for other_row in other.rows {
            let mut row = vec![None; self.columns.len()];
            for (cell, &idx) in other_row.into_iter().zip(&mapping) {
                row[idx] = cell;
            }
            self.rows.push(row);
        }
        self
    }

    /// 🗑️ Drop the named columns if present. Missing ones are ignored.
    pub(crate) fn drop_columns(&mut self, doomed: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !doomed.contains(&c.as_str()))
            .collect();
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }
}
