use crate::errors::PipelineError;
use crate::types::ColumnName;

/// Header row plus string cells; the header names are the schema contract between stages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<ColumnName>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnName>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Header names in column order.
    pub fn headers(&self) -> &[ColumnName] {
        &self.headers
    }

    /// All rows; each has exactly `headers().len()` cells.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows, header excluded.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Position of `name`, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Position of `name`, or a schema error naming `context`.
    pub fn require_column(&self, name: &str, context: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::SchemaMismatch {
                column: name.to_string(),
                context: context.to_string(),
            })
    }

    /// Cell at (`row`, `column`); empty for out-of-range positions.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Iterate one column top to bottom.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).map(String::as_str).unwrap_or(""))
    }

    /// Replace every value in `column` via `f`.
    pub fn map_column<F>(&mut self, column: usize, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = f(cell);
            }
        }
    }

    /// Overwrite `name` with `values`, appending the column when it is new.
    ///
    /// `values` must yield one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), PipelineError> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::Configuration(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Remove every column whose name satisfies `predicate`.
    pub fn drop_columns<P>(&mut self, mut predicate: P)
    where
        P: FnMut(&str) -> bool,
    {
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|header| !predicate(header))
            .collect();
        if keep.iter().all(|keep| *keep) {
            return;
        }
        self.headers = retain_by_mask(std::mem::take(&mut self.headers), &keep);
        for row in &mut self.rows {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }
    }
}

fn retain_by_mask<T>(values: Vec<T>, keep: &[bool]) -> Vec<T> {
    values
        .into_iter()
        .zip(keep.iter())
        .filter_map(|(value, keep)| keep.then_some(value))
        .collect()
}
