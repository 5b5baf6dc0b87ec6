use crate::config::ResultSetType;
use crate::driver::RowCursor;
use crate::error::SqlFacadeError;
use crate::types::RowValues;

/// A cursor over rows already pulled from the driver.
///
/// Drivers that fetch eagerly hand one of these back from `execute_query`.
/// Random access is only allowed when the statement asked for a scrollable
/// type. Forward-only cursors hand rows out by value; scrollable ones keep
/// every row so they can be revisited.
#[derive(Debug, Clone)]
pub struct VecCursor {
    column_names: Vec<String>,
    rows: Vec<Vec<RowValues>>,
    /// Index of the row the next `next_row` returns.
    position: usize,
    cursor_type: ResultSetType,
}

impl VecCursor {
    #[must_use]
    pub fn new(
        column_names: Vec<String>,
        rows: Vec<Vec<RowValues>>,
        cursor_type: ResultSetType,
    ) -> Self {
        Self {
            column_names,
            rows,
            position: 0,
            cursor_type,
        }
    }
}

impl RowCursor for VecCursor {
    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn cursor_type(&self) -> ResultSetType {
        self.cursor_type
    }

    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlFacadeError> {
        let Some(slot) = self.rows.get_mut(self.position) else {
            return Ok(None);
        };
        let row = if self.cursor_type.is_scrollable() {
            slot.clone()
        } else {
            std::mem::take(slot)
        };
        self.position += 1;
        Ok(Some(row))
    }

    fn absolute(&mut self, row: usize) -> Result<bool, SqlFacadeError> {
        if !self.cursor_type.is_scrollable() {
            return Err(SqlFacadeError::ExecutionError(
                "absolute positioning requires a scrollable cursor".into(),
            ));
        }
        let total = self.rows.len();
        self.position = row.min(total);
        Ok(row >= 1 && row <= total)
    }

    fn close(&mut self) -> Result<(), SqlFacadeError> {
        self.rows = Vec::new();
        self.position = 0;
        Ok(())
    }
}
