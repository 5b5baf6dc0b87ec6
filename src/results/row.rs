use std::collections::HashMap;
use std::sync::Arc;

use crate::model::PropertyReadable;
use crate::types::RowValues;

/// A row from a database query result
///
/// Column lookup by name is case-insensitive, so a fetched row can be fed
/// straight back in as a model for named placeholders.
#[derive(Debug, Clone)]
pub struct RowResult {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
    // lowercased column name -> index, shared across the result set
    column_index: Arc<HashMap<String, usize>>,
}

impl RowResult {
    /// Create a row, building its own column index.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let column_index = Arc::new(build_column_index(&column_names));
        Self {
            column_names,
            values,
            column_index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index
            .get(&column_name.to_lowercase())
            .copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertyReadable for RowResult {
    fn property(&self, name: &str) -> Option<RowValues> {
        self.get(name).cloned()
    }
}

/// Lowercased name -> first index; duplicate labels resolve to the first column.
pub(crate) fn build_column_index(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        index.entry(name.to_lowercase()).or_insert(i);
    }
    index
}
