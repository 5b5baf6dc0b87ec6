//! Execution paths: row-producing queries, updates and calls, and batches.
//!
//! Every path follows the same shape: resolve named parameters, check out a
//! connection and statement through an `ExecutionContext`, run, and let the
//! context release what it holds. Failures are logged with the SQL text and
//! returned unchanged.

mod batch;
mod query;
mod update;

pub use batch::{BatchingPreparedStatement, BatchingStatement};
pub use query::Page;

use crate::binding::{bind, to_statement_params};
use crate::config::NullHandling;
use crate::driver::{RowCursor, Statement};
use crate::error::SqlFacadeError;
use crate::facade::Sql;
use crate::lifecycle::ExecutionContext;
use crate::statement::StatementCommand;
use crate::translation::rewrite_null_comparisons;
use crate::types::{Param, StatementParam};

/// SQL and driver parameters ready to execute.
#[derive(Debug, Clone)]
pub(crate) struct PreparedCall {
    pub(crate) sql: String,
    pub(crate) params: Vec<StatementParam>,
}

impl PreparedCall {
    pub(crate) fn plain(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }
}

pub(crate) fn log_failure<T>(sql: &str, result: Result<T, SqlFacadeError>) -> Result<T, SqlFacadeError> {
    if let Err(err) = &result {
        tracing::warn!(sql = %sql, error = %err, "Failed to execute");
    }
    result
}

impl Sql {
    /// Rewrite named placeholders and bind the caller's arguments.
    ///
    /// Runs before any connection is checked out, so a scan or bind failure
    /// never touches the database.
    pub(crate) fn prepare_call(
        &self,
        sql: &str,
        params: &[Param],
    ) -> Result<PreparedCall, SqlFacadeError> {
        let (text, resolved) = match self.named.resolve(sql)? {
            Some(named) => (named.sql.clone(), bind(&named.plan, params)?),
            None => (sql.to_string(), params.to_vec()),
        };
        let (text, resolved) = match self.null_handling {
            NullHandling::Bind => (text, resolved),
            NullHandling::RewriteComparisons => rewrite_null_comparisons(&text, resolved)?,
        };
        Ok(PreparedCall {
            sql: text,
            params: to_statement_params(resolved)?,
        })
    }

    /// Run `op` against a statement created (or fetched from the cache) for `call`.
    ///
    /// `op` may park an open cursor in the slot it is given; the cursor is
    /// closed together with the other resources.
    pub(crate) fn run_statement<T, F>(
        &self,
        command: StatementCommand,
        call: &PreparedCall,
        op: F,
    ) -> Result<T, SqlFacadeError>
    where
        F: FnOnce(&mut dyn Statement, &PreparedCall, &mut Option<Box<dyn RowCursor>>) -> Result<T, SqlFacadeError>,
    {
        let result = ExecutionContext::open(self).and_then(|mut ctx| run_in(&mut ctx, command, call, op));
        log_failure(&call.sql, result)
    }
}

fn run_in<T, F>(
    ctx: &mut ExecutionContext<'_>,
    command: StatementCommand,
    call: &PreparedCall,
    op: F,
) -> Result<T, SqlFacadeError>
where
    F: FnOnce(&mut dyn Statement, &PreparedCall, &mut Option<Box<dyn RowCursor>>) -> Result<T, SqlFacadeError>,
{
    let handle = ctx.acquire_statement(command, &call.sql)?;
    let mut stmt = handle.lock()?;
    tracing::debug!(sql = %call.sql, params = call.params.len(), kind = ?stmt.kind(), "Executing statement");
    op(stmt.as_mut(), call, &mut ctx.cursor)
}
