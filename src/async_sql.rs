//! Async bridge: runs blocking facade calls on tokio's blocking pool.

use std::sync::Arc;

use crate::error::SqlFacadeError;
use crate::executor::Page;
use crate::facade::Sql;
use crate::results::{ResultSet, RowResult};
use crate::types::{Param, RowValues};

/// Cloneable async handle to a shared [`Sql`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use sql_facade::prelude::*;
///
/// # async fn demo() -> Result<(), SqlFacadeError> {
/// let sql = AsyncSql::new(Sql::new(Arc::new(SqliteDataSource::new("app.db")), SqlConfig::default()));
/// let rows = sql.rows_with("select * from person where name = :name", vec![
///     Param::from_serialize(&serde_json::json!({ "name": "ada" }))?,
/// ]).await?;
/// # let _ = rows;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AsyncSql {
    inner: Arc<Sql>,
}

impl AsyncSql {
    #[must_use]
    pub fn new(sql: Sql) -> Self {
        Self {
            inner: Arc::new(sql),
        }
    }

    #[must_use]
    pub fn from_shared(sql: Arc<Sql>) -> Self {
        Self { inner: sql }
    }

    /// The wrapped facade, for synchronous use.
    #[must_use]
    pub fn facade(&self) -> &Arc<Sql> {
        &self.inner
    }

    /// Run any blocking facade work on the blocking pool.
    ///
    /// # Errors
    /// Returns the error of `func`, or `SqlFacadeError::ExecutionError` if
    /// the blocking task panicked or was cancelled.
    pub async fn run<R, F>(&self, func: F) -> Result<R, SqlFacadeError>
    where
        F: FnOnce(&Sql) -> Result<R, SqlFacadeError> + Send + 'static,
        R: Send + 'static,
    {
        let sql = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || func(&sql))
            .await
            .map_err(|e| SqlFacadeError::ExecutionError(format!("spawn_blocking join error: {e}")))?
    }

    /// # Errors
    /// See [`Sql::rows`].
    pub async fn rows(&self, sql: impl Into<String>) -> Result<ResultSet, SqlFacadeError> {
        let sql = sql.into();
        self.run(move |facade| facade.rows(&sql)).await
    }

    /// # Errors
    /// See [`Sql::rows_with`].
    pub async fn rows_with(
        &self,
        sql: impl Into<String>,
        params: Vec<Param>,
    ) -> Result<ResultSet, SqlFacadeError> {
        let sql = sql.into();
        self.run(move |facade| facade.rows_with(&sql, &params)).await
    }

    /// # Errors
    /// See [`Sql::rows_with_paged`].
    pub async fn rows_with_paged(
        &self,
        sql: impl Into<String>,
        params: Vec<Param>,
        page: Page,
    ) -> Result<ResultSet, SqlFacadeError> {
        let sql = sql.into();
        self.run(move |facade| facade.rows_with_paged(&sql, &params, page.offset, page.max_rows))
            .await
    }

    /// # Errors
    /// See [`Sql::first_row_with`].
    pub async fn first_row_with(
        &self,
        sql: impl Into<String>,
        params: Vec<Param>,
    ) -> Result<Option<RowResult>, SqlFacadeError> {
        let sql = sql.into();
        self.run(move |facade| facade.first_row_with(&sql, &params)).await
    }

    /// # Errors
    /// See [`Sql::execute`].
    pub async fn execute(&self, sql: impl Into<String>) -> Result<bool, SqlFacadeError> {
        let sql = sql.into();
        self.run(move |facade| facade.execute(&sql)).await
    }

    /// # Errors
    /// See [`Sql::execute_update_with`].
    pub async fn execute_update_with(
        &self,
        sql: impl Into<String>,
        params: Vec<Param>,
    ) -> Result<i64, SqlFacadeError> {
        let sql = sql.into();
        self.run(move |facade| facade.execute_update_with(&sql, &params)).await
    }

    /// # Errors
    /// See [`Sql::execute_insert_with`].
    pub async fn execute_insert_with(
        &self,
        sql: impl Into<String>,
        params: Vec<Param>,
    ) -> Result<Vec<Vec<RowValues>>, SqlFacadeError> {
        let sql = sql.into();
        self.run(move |facade| facade.execute_insert_with(&sql, &params)).await
    }

    /// Run a prepared batch of parameter sets.
    ///
    /// # Errors
    /// See [`Sql::with_prepared_batch`].
    pub async fn prepared_batch(
        &self,
        partition: usize,
        sql: impl Into<String>,
        units: Vec<Vec<Param>>,
    ) -> Result<Vec<i64>, SqlFacadeError> {
        let sql = sql.into();
        self.run(move |facade| {
            facade.with_prepared_batch(partition, &sql, |batch| {
                units.iter().try_for_each(|unit| batch.add_batch(unit))
            })
        })
        .await
    }

    /// Run a transaction body on the blocking pool.
    ///
    /// # Errors
    /// See [`Sql::with_transaction`].
    pub async fn with_transaction<R, F>(&self, body: F) -> Result<R, SqlFacadeError>
    where
        F: FnOnce(&Sql) -> Result<R, SqlFacadeError> + Send + 'static,
        R: Send + 'static,
    {
        self.run(move |facade| facade.with_transaction(body)).await
    }

    /// # Errors
    /// Returns `SqlFacadeError::ExecutionError` if the blocking task fails.
    pub async fn close(&self) -> Result<(), SqlFacadeError> {
        self.run(|facade| {
            facade.close();
            Ok(())
        })
        .await
    }
}
