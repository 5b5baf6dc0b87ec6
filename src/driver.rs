//! Contracts for the collaborators the facade drives: a connection source,
//! connections, statements and result cursors.
//!
//! The facade never talks to a database directly. A driver (the bundled
//! SQLite one, or a test double) implements these traits and the facade
//! decides when each handle is created, reused and closed.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ResultSetType, StatementOptions};
use crate::error::SqlFacadeError;
use crate::types::{RowValues, StatementParam};

/// Source of connections, usually backed by a pool.
pub trait DataSource: Send + Sync {
    /// Check out a connection for the duration of one call or scope.
    ///
    /// # Errors
    /// Returns `SqlFacadeError` if no connection can be provided.
    fn get_connection(&self) -> Result<Arc<dyn Connection>, SqlFacadeError>;
}

/// Which statement flavour a driver should create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Non-parameterised statement; SQL text is supplied per execution.
    Plain,
    /// Positional prepared statement.
    Prepared,
    /// Prepared statement that reports generated keys after an insert.
    PreparedWithKeys,
    /// Stored-procedure call.
    Callable,
}

/// A live database connection.
///
/// Methods take `&self`; implementations guard their native handle
/// internally so a connection can be shared by the facade's held-connection
/// slot and the statements created from it.
pub trait Connection: Send + Sync {
    /// Create a statement. `sql` is `None` for [`StatementKind::Plain`].
    ///
    /// # Errors
    /// Returns `SqlFacadeError` if the driver rejects the statement.
    fn create_statement(
        &self,
        kind: StatementKind,
        sql: Option<&str>,
        options: StatementOptions,
    ) -> Result<Box<dyn Statement>, SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` if the state cannot be read.
    fn auto_commit(&self) -> Result<bool, SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` if the mode cannot be switched.
    fn set_auto_commit(&self, enabled: bool) -> Result<(), SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` if the commit fails.
    fn commit(&self) -> Result<(), SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` if the rollback fails.
    fn rollback(&self) -> Result<(), SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` if the connection fails to close cleanly.
    fn close(&self) -> Result<(), SqlFacadeError>;
}

/// Outcome of a generic `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOutcome {
    /// Whether the first result is a row set.
    pub has_rows: bool,
    /// Update count of the first result, `-1` when it is a row set.
    pub update_count: i64,
}

/// One unit of work submitted to a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchUnit {
    /// Complete SQL text, for plain statements.
    Sql(String),
    /// One parameter set, for prepared statements.
    Params(Vec<StatementParam>),
}

/// A driver statement.
///
/// Parameters are supplied with every execution; prepared statements ignore
/// the `sql` argument and run the text they were created for.
pub trait Statement: Send {
    fn kind(&self) -> StatementKind;

    /// Cap on rows materialised by the driver; `0` means unlimited.
    fn set_max_rows(&mut self, _max_rows: usize) {}

    fn set_fetch_size(&mut self, _fetch_size: usize) {}

    fn set_query_timeout(&mut self, _timeout: Duration) {}

    /// # Errors
    /// Returns `SqlFacadeError` on driver failure.
    fn execute_query(
        &mut self,
        sql: &str,
        params: &[StatementParam],
    ) -> Result<Box<dyn RowCursor>, SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` on driver failure.
    fn execute_update(&mut self, sql: &str, params: &[StatementParam])
    -> Result<i64, SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` on driver failure.
    fn execute(
        &mut self,
        sql: &str,
        params: &[StatementParam],
    ) -> Result<ExecuteOutcome, SqlFacadeError>;

    /// Keys generated by the last insert, one row per inserted row.
    ///
    /// # Errors
    /// Returns `SqlFacadeError` on driver failure.
    fn generated_keys(&mut self) -> Result<Vec<Vec<RowValues>>, SqlFacadeError>;

    /// Values of out/inout parameters after a call, in parameter order.
    ///
    /// # Errors
    /// Returns `SqlFacadeError` on driver failure.
    fn out_values(&mut self) -> Result<Vec<RowValues>, SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` if the unit does not fit this statement.
    fn add_batch(&mut self, unit: BatchUnit) -> Result<(), SqlFacadeError>;

    fn clear_batch(&mut self);

    /// Run all pending units, returning one update count per unit in order.
    ///
    /// # Errors
    /// Returns `SqlFacadeError` on driver failure.
    fn execute_batch(&mut self) -> Result<Vec<i64>, SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` if the statement fails to close cleanly.
    fn close(&mut self) -> Result<(), SqlFacadeError>;
}

/// An open result cursor.
pub trait RowCursor: Send {
    fn column_names(&self) -> &[String];

    fn cursor_type(&self) -> ResultSetType;

    /// Advance and return the next row, `None` once exhausted.
    ///
    /// # Errors
    /// Returns `SqlFacadeError` on driver failure.
    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlFacadeError>;

    /// Position on the 1-based `row` so the following `next_row` yields
    /// `row + 1`. Returns `false` when `row` lies past the end.
    ///
    /// # Errors
    /// Returns `SqlFacadeError` when the cursor is forward-only or the driver fails.
    fn absolute(&mut self, row: usize) -> Result<bool, SqlFacadeError>;

    /// # Errors
    /// Returns `SqlFacadeError` if the cursor fails to close cleanly.
    fn close(&mut self) -> Result<(), SqlFacadeError>;
}
