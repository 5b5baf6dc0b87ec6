use crate::driver::ExecuteOutcome;
use crate::error::SqlFacadeError;
use crate::facade::Sql;
use crate::statement::StatementCommand;
use crate::types::{Param, RowValues};

use super::{PreparedCall, log_failure};

impl Sql {
    /// Execute arbitrary SQL. Returns `true` when the first result is a row
    /// set; otherwise the update count is recorded in [`Sql::update_count`].
    ///
    /// # Errors
    /// Returns the driver's `SqlFacadeError`.
    pub fn execute(&self, sql: &str) -> Result<bool, SqlFacadeError> {
        let outcome = self.run_execute(StatementCommand::Plain, &PreparedCall::plain(sql))?;
        Ok(outcome.has_rows)
    }

    /// Parameterised form of [`Sql::execute`].
    ///
    /// # Errors
    /// Returns `SqlFacadeError::Scan`/`Bind` before touching the database,
    /// or the driver's error.
    pub fn execute_with(&self, sql: &str, params: &[Param]) -> Result<bool, SqlFacadeError> {
        let call = log_failure(sql, self.prepare_call(sql, params))?;
        let outcome = self.run_execute(
            StatementCommand::Prepared {
                return_generated_keys: false,
            },
            &call,
        )?;
        Ok(outcome.has_rows)
    }

    /// Run an insert/update/delete and return the number of affected rows.
    ///
    /// # Errors
    /// Returns the driver's `SqlFacadeError`.
    pub fn execute_update(&self, sql: &str) -> Result<i64, SqlFacadeError> {
        self.run_update(StatementCommand::Plain, &PreparedCall::plain(sql))
    }

    /// # Errors
    /// See [`Sql::execute_with`].
    pub fn execute_update_with(&self, sql: &str, params: &[Param]) -> Result<i64, SqlFacadeError> {
        let call = log_failure(sql, self.prepare_call(sql, params))?;
        self.run_update(
            StatementCommand::Prepared {
                return_generated_keys: false,
            },
            &call,
        )
    }

    /// Run an insert and return the generated keys, one row per inserted row.
    ///
    /// # Errors
    /// Returns the driver's `SqlFacadeError`.
    pub fn execute_insert(&self, sql: &str) -> Result<Vec<Vec<RowValues>>, SqlFacadeError> {
        self.run_insert(&PreparedCall::plain(sql))
    }

    /// # Errors
    /// See [`Sql::execute_with`].
    pub fn execute_insert_with(
        &self,
        sql: &str,
        params: &[Param],
    ) -> Result<Vec<Vec<RowValues>>, SqlFacadeError> {
        let call = log_failure(sql, self.prepare_call(sql, params))?;
        self.run_insert(&call)
    }

    /// Invoke a stored procedure and return its update count.
    ///
    /// # Errors
    /// Returns the driver's `SqlFacadeError`; drivers without procedures
    /// return `SqlFacadeError::Unimplemented`.
    pub fn call(&self, sql: &str) -> Result<i64, SqlFacadeError> {
        self.call_with(sql, &[])
    }

    /// # Errors
    /// See [`Sql::call`].
    pub fn call_with(&self, sql: &str, params: &[Param]) -> Result<i64, SqlFacadeError> {
        let call = log_failure(sql, self.prepare_call(sql, params))?;
        let outcome = self.run_execute(StatementCommand::Callable, &call)?;
        Ok(outcome.update_count)
    }

    /// Invoke a stored procedure and return the values of its out and in/out
    /// parameters, in parameter order.
    ///
    /// ```rust,ignore
    /// let outs = sql.call_with_outputs("{call next_id(?, ?)}", &[
    ///     Param::from("orders"),
    ///     Param::Out(SqlType::BigInt),
    /// ])?;
    /// ```
    ///
    /// # Errors
    /// See [`Sql::call`].
    pub fn call_with_outputs(
        &self,
        sql: &str,
        params: &[Param],
    ) -> Result<Vec<RowValues>, SqlFacadeError> {
        let call = log_failure(sql, self.prepare_call(sql, params))?;
        self.run_statement(StatementCommand::Callable, &call, |stmt, call, _| {
            let outcome = stmt.execute(&call.sql, &call.params)?;
            self.record_update_count(outcome.update_count);
            stmt.out_values()
        })
    }

    fn run_execute(
        &self,
        command: StatementCommand,
        call: &PreparedCall,
    ) -> Result<ExecuteOutcome, SqlFacadeError> {
        self.run_statement(command, call, |stmt, call, _| {
            let outcome = stmt.execute(&call.sql, &call.params)?;
            self.record_update_count(outcome.update_count);
            Ok(outcome)
        })
    }

    fn run_update(&self, command: StatementCommand, call: &PreparedCall) -> Result<i64, SqlFacadeError> {
        self.run_statement(command, call, |stmt, call, _| {
            let count = stmt.execute_update(&call.sql, &call.params)?;
            self.record_update_count(count);
            Ok(count)
        })
    }

    fn run_insert(&self, call: &PreparedCall) -> Result<Vec<Vec<RowValues>>, SqlFacadeError> {
        let command = StatementCommand::Prepared {
            return_generated_keys: true,
        };
        self.run_statement(command, call, |stmt, call, _| {
            let count = stmt.execute_update(&call.sql, &call.params)?;
            self.record_update_count(count);
            stmt.generated_keys()
        })
    }
}
