use std::collections::HashMap;
use std::sync::Arc;

use super::row::{RowResult, build_column_index};
use crate::types::RowValues;

/// Rows returned by a query, sharing one set of column names.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<RowResult>,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        let column_index = Arc::new(build_column_index(&column_names));
        Self {
            results: Vec::new(),
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Materialise one fetched row and append it.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let row = self.make_row(row_values);
        self.results.push(row);
    }

    /// Build a row sharing this set's columns without appending it.
    pub(crate) fn make_row(&self, row_values: Vec<RowValues>) -> RowResult {
        RowResult::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            row_values,
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&RowResult> {
        self.results.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowResult> {
        self.results.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = RowResult;
    type IntoIter = std::vec::IntoIter<RowResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a RowResult;
    type IntoIter = std::slice::Iter<'a, RowResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
