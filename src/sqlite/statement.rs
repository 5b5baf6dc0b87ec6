use std::time::Duration;

use rusqlite::params_from_iter;

use crate::config::StatementOptions;
use crate::driver::{BatchUnit, ExecuteOutcome, RowCursor, Statement, StatementKind};
use crate::error::SqlFacadeError;
use crate::types::{RowValues, StatementParam};

use super::connection::{SharedSqliteConnection, with_native};
use super::params::convert_params;
use super::query::build_cursor;

/// Plain or prepared statement on a [`super::SqliteConnection`].
///
/// rusqlite statements borrow their connection, so the SQL is re-prepared
/// through the connection's prepared-statement cache on every execution.
pub struct SqliteStatement {
    handle: SharedSqliteConnection,
    kind: StatementKind,
    sql: Option<String>,
    options: StatementOptions,
    max_rows: usize,
    query_timeout: Option<Duration>,
    batch: Vec<BatchUnit>,
    generated_keys: Vec<Vec<RowValues>>,
    closed: bool,
}

impl SqliteStatement {
    pub(crate) fn new(
        handle: SharedSqliteConnection,
        kind: StatementKind,
        sql: Option<String>,
        options: StatementOptions,
    ) -> Self {
        Self {
            handle,
            kind,
            sql,
            options,
            max_rows: 0,
            query_timeout: None,
            batch: Vec::new(),
            generated_keys: Vec::new(),
            closed: false,
        }
    }

    fn text<'a>(&'a self, sql: &'a str) -> &'a str {
        self.sql.as_deref().unwrap_or(sql)
    }

    fn with_connection<R, F>(&self, func: F) -> Result<R, SqlFacadeError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<R, SqlFacadeError>,
    {
        if self.closed {
            return Err(SqlFacadeError::ExecutionError("statement is closed".into()));
        }
        with_native(&self.handle, |conn| {
            if let Some(timeout) = self.query_timeout {
                conn.busy_timeout(timeout)?;
            }
            func(conn)
        })
    }

    fn run_unit(conn: &rusqlite::Connection, sql: &str, params: &[StatementParam]) -> Result<i64, SqlFacadeError> {
        let values = convert_params(params)?;
        let mut stmt = conn.prepare_cached(sql)?;
        let affected = stmt.execute(params_from_iter(values.iter()))?;
        Ok(i64::try_from(affected).unwrap_or(i64::MAX))
    }
}

impl Statement for SqliteStatement {
    fn kind(&self) -> StatementKind {
        self.kind
    }

    fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = max_rows;
    }

    fn set_query_timeout(&mut self, timeout: Duration) {
        self.query_timeout = Some(timeout);
    }

    fn execute_query(
        &mut self,
        sql: &str,
        params: &[StatementParam],
    ) -> Result<Box<dyn RowCursor>, SqlFacadeError> {
        let text = self.text(sql);
        let values = convert_params(params)?;
        let cursor = self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(text)?;
            build_cursor(&mut stmt, &values, self.max_rows, self.options.result_set_type)
        })?;
        Ok(Box::new(cursor))
    }

    fn execute_update(
        &mut self,
        sql: &str,
        params: &[StatementParam],
    ) -> Result<i64, SqlFacadeError> {
        let text = self.text(sql);
        let track_keys = self.kind == StatementKind::PreparedWithKeys;
        let (count, keys) = self.with_connection(|conn| {
            let count = Self::run_unit(conn, text, params)?;
            let keys = if track_keys && count > 0 {
                vec![vec![RowValues::Int(conn.last_insert_rowid())]]
            } else {
                Vec::new()
            };
            Ok((count, keys))
        })?;
        self.generated_keys = keys;
        Ok(count)
    }

    fn execute(
        &mut self,
        sql: &str,
        params: &[StatementParam],
    ) -> Result<ExecuteOutcome, SqlFacadeError> {
        let text = self.text(sql);
        let values = convert_params(params)?;
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(text)?;
            if stmt.column_count() > 0 {
                let mut rows = stmt.query(params_from_iter(values.iter()))?;
                rows.next()?;
                return Ok(ExecuteOutcome {
                    has_rows: true,
                    update_count: -1,
                });
            }
            let affected = stmt.execute(params_from_iter(values.iter()))?;
            Ok(ExecuteOutcome {
                has_rows: false,
                update_count: i64::try_from(affected).unwrap_or(i64::MAX),
            })
        })
    }

    fn generated_keys(&mut self) -> Result<Vec<Vec<RowValues>>, SqlFacadeError> {
        Ok(std::mem::take(&mut self.generated_keys))
    }

    fn out_values(&mut self) -> Result<Vec<RowValues>, SqlFacadeError> {
        Err(SqlFacadeError::Unimplemented(
            "out parameters are not supported by SQLite".into(),
        ))
    }

    fn add_batch(&mut self, unit: BatchUnit) -> Result<(), SqlFacadeError> {
        match (&unit, self.kind) {
            (BatchUnit::Sql(_), StatementKind::Plain)
            | (BatchUnit::Params(_), StatementKind::Prepared | StatementKind::PreparedWithKeys) => {
                self.batch.push(unit);
                Ok(())
            }
            _ => Err(SqlFacadeError::ExecutionError(format!(
                "batch unit does not match a {:?} statement",
                self.kind
            ))),
        }
    }

    fn clear_batch(&mut self) {
        self.batch.clear();
    }

    fn execute_batch(&mut self) -> Result<Vec<i64>, SqlFacadeError> {
        let units = std::mem::take(&mut self.batch);
        let prepared = self.sql.as_deref().unwrap_or_default();
        self.with_connection(|conn| {
            units
                .iter()
                .map(|unit| match unit {
                    BatchUnit::Sql(sql) => Self::run_unit(conn, sql, &[]),
                    BatchUnit::Params(params) => Self::run_unit(conn, prepared, params),
                })
                .collect()
        })
    }

    fn close(&mut self) -> Result<(), SqlFacadeError> {
        self.batch.clear();
        self.closed = true;
        Ok(())
    }
}
