use std::sync::Arc;

use crate::binding::{bind, to_statement_params};
use crate::driver::{BatchUnit, Statement};
use crate::error::SqlFacadeError;
use crate::facade::Sql;
use crate::lifecycle::ExecutionContext;
use crate::statement::StatementCommand;
use crate::translation::NamedSql;
use crate::types::Param;

use super::log_failure;

/// Pending units plus the counts of everything already flushed.
struct Batcher<'s> {
    statement: &'s mut dyn Statement,
    partition: usize,
    pending: usize,
    counts: Vec<i64>,
}

impl<'s> Batcher<'s> {
    fn new(statement: &'s mut dyn Statement, partition: usize) -> Self {
        Self {
            statement,
            partition,
            pending: 0,
            counts: Vec::new(),
        }
    }

    fn add(&mut self, unit: BatchUnit) -> Result<(), SqlFacadeError> {
        self.statement.add_batch(unit)?;
        self.pending += 1;
        if self.partition > 0 && self.pending == self.partition {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SqlFacadeError> {
        let counts = self.statement.execute_batch()?;
        tracing::debug!(units = counts.len(), "Successfully executed batch");
        self.counts.extend(counts);
        self.pending = 0;
        Ok(())
    }

    fn clear(&mut self) {
        self.statement.clear_batch();
        self.pending = 0;
    }

    fn finish(mut self) -> Result<Vec<i64>, SqlFacadeError> {
        if self.pending > 0 {
            self.flush()?;
        }
        Ok(self.counts)
    }
}

/// Collects complete SQL statements and runs them as a batch.
///
/// With a partition size above zero the pending units are flushed every
/// `partition` additions; whatever is left runs when the batch body returns.
pub struct BatchingStatement<'s> {
    batcher: Batcher<'s>,
}

impl BatchingStatement<'_> {
    /// Queue one SQL statement.
    ///
    /// # Errors
    /// Returns the driver's error, including that of an automatic flush.
    pub fn add_batch(&mut self, sql: impl Into<String>) -> Result<(), SqlFacadeError> {
        self.batcher.add(BatchUnit::Sql(sql.into()))
    }

    /// Drop queued units that have not been flushed yet.
    pub fn clear_batch(&mut self) {
        self.batcher.clear();
    }

    /// Run the queued units now.
    ///
    /// # Errors
    /// Returns the driver's error.
    pub fn execute_batch(&mut self) -> Result<(), SqlFacadeError> {
        self.batcher.flush()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.batcher.pending
    }
}

/// Collects parameter sets for one prepared statement and runs them as a batch.
///
/// Named placeholders in the statement's SQL are resolved against every
/// parameter set as it is added.
pub struct BatchingPreparedStatement<'s> {
    batcher: Batcher<'s>,
    named: Option<Arc<NamedSql>>,
}

impl BatchingPreparedStatement<'_> {
    /// Queue one parameter set.
    ///
    /// # Errors
    /// Returns `SqlFacadeError::Bind` when the set does not fit the
    /// placeholders, or the driver's error.
    pub fn add_batch(&mut self, params: &[Param]) -> Result<(), SqlFacadeError> {
        let resolved = match &self.named {
            Some(named) => bind(&named.plan, params)?,
            None => params.to_vec(),
        };
        self.batcher
            .add(BatchUnit::Params(to_statement_params(resolved)?))
    }

    pub fn clear_batch(&mut self) {
        self.batcher.clear();
    }

    /// # Errors
    /// Returns the driver's error.
    pub fn execute_batch(&mut self) -> Result<(), SqlFacadeError> {
        self.batcher.flush()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.batcher.pending
    }
}

impl Sql {
    /// Run `body` with a statement that batches SQL text.
    ///
    /// Returns one update count per queued statement, in the order they
    /// were added. `partition` of `0` flushes only when the body ends or
    /// calls `execute_batch`.
    ///
    /// ```rust,ignore
    /// let counts = sql.with_batch(2, |batch| {
    ///     batch.add_batch("insert into t values (1)")?;
    ///     batch.add_batch("insert into t values (2)")?;
    ///     Ok(())
    /// })?;
    /// ```
    ///
    /// # Errors
    /// Returns the first error raised by `body` or the driver. The
    /// statement and connection are released either way.
    pub fn with_batch<F>(&self, partition: usize, body: F) -> Result<Vec<i64>, SqlFacadeError>
    where
        F: FnOnce(&mut BatchingStatement<'_>) -> Result<(), SqlFacadeError>,
    {
        let _flag = self.enter_batch();
        let result = ExecutionContext::open(self).and_then(|mut ctx| {
            run_batch(&mut ctx, StatementCommand::Plain, "", false, |stmt| {
                let mut batch = BatchingStatement {
                    batcher: Batcher::new(stmt, partition),
                };
                body(&mut batch)?;
                batch.batcher.finish()
            })
        });
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Error during batch execution");
        }
        result
    }

    /// Run `body` with a prepared statement for `sql` that batches parameter sets.
    ///
    /// The statement is shared with the statement cache when caching is on.
    ///
    /// # Errors
    /// Returns `SqlFacadeError::Scan` for malformed SQL, or the first error
    /// raised by `body` or the driver.
    pub fn with_prepared_batch<F>(
        &self,
        partition: usize,
        sql: &str,
        body: F,
    ) -> Result<Vec<i64>, SqlFacadeError>
    where
        F: FnOnce(&mut BatchingPreparedStatement<'_>) -> Result<(), SqlFacadeError>,
    {
        let _flag = self.enter_batch();
        let named = log_failure(sql, self.named.resolve(sql))?;
        let text = named.as_ref().map_or(sql, |named| named.sql.as_str());
        let command = StatementCommand::Prepared {
            return_generated_keys: false,
        };
        let result = ExecutionContext::open(self).and_then(|mut ctx| {
            run_batch(&mut ctx, command, text, true, |stmt| {
                let mut batch = BatchingPreparedStatement {
                    batcher: Batcher::new(stmt, partition),
                    named: named.clone(),
                };
                body(&mut batch)?;
                batch.batcher.finish()
            })
        });
        log_failure(text, result)
    }
}

fn run_batch<F>(
    ctx: &mut ExecutionContext<'_>,
    command: StatementCommand,
    sql: &str,
    cache_aware: bool,
    op: F,
) -> Result<Vec<i64>, SqlFacadeError>
where
    F: FnOnce(&mut dyn Statement) -> Result<Vec<i64>, SqlFacadeError>,
{
    let handle = if cache_aware {
        ctx.acquire_statement(command, sql)?
    } else {
        ctx.create_statement(command, sql)?
    };
    let mut stmt = handle.lock()?;
    let outcome = op(stmt.as_mut());
    if outcome.is_err() {
        stmt.clear_batch();
    }
    outcome
}
