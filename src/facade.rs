//! The `Sql` facade: shared caches, the held-connection slot and the
//! scoped operations that retain a connection across several calls.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::config::{NullHandling, SqlConfig, StatementOptions};
use crate::driver::{Connection, DataSource, Statement};
use crate::error::SqlFacadeError;
use crate::lifecycle::ConnectionSource;
use crate::named_cache::NamedQueryCache;
use crate::statement::StatementCache;

/// Hook run once on every newly created statement.
pub type StatementHook = Arc<dyn Fn(&mut dyn Statement) + Send + Sync>;

/// Named-parameter SQL facade over a [`DataSource`] or a single [`Connection`].
///
/// One instance can be shared between threads. Each call checks out a
/// connection and a statement, runs, and releases them again unless a
/// caching scope is active.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use sql_facade::prelude::*;
/// use sql_facade::sqlite::SqliteDataSource;
///
/// let sql = Sql::new(Arc::new(SqliteDataSource::new("app.db")), SqlConfig::default());
/// sql.execute("create table person (id integer primary key, name text)")?;
/// sql.execute_update_with("insert into person (name) values (:name)", &[
///     Param::from_serialize(&serde_json::json!({ "name": "ada" }))?,
/// ])?;
/// let people = sql.rows("select * from person")?;
/// assert_eq!(people.len(), 1);
/// # Ok::<(), SqlFacadeError>(())
/// ```
pub struct Sql {
    pub(crate) source: ConnectionSource,
    pub(crate) held: Mutex<Option<Arc<dyn Connection>>>,
    cache_connection: AtomicBool,
    cache_statements: AtomicBool,
    within_batch: AtomicBool,
    pub(crate) named: NamedQueryCache,
    pub(crate) statements: StatementCache,
    pub(crate) statement_options: StatementOptions,
    pub(crate) null_handling: NullHandling,
    pub(crate) configure_statement: RwLock<Option<StatementHook>>,
    update_count: AtomicI64,
}

impl Sql {
    /// Facade that checks connections out of `data_source` per call.
    #[must_use]
    pub fn new(data_source: Arc<dyn DataSource>, config: SqlConfig) -> Self {
        Self::build(ConnectionSource::DataSource(data_source), None, config)
    }

    /// Facade over a caller-owned connection. The facade never closes it.
    #[must_use]
    pub fn from_connection(connection: Arc<dyn Connection>, config: SqlConfig) -> Self {
        let held = Some(Arc::clone(&connection));
        Self::build(ConnectionSource::Direct(connection), held, config)
    }

    fn build(
        source: ConnectionSource,
        held: Option<Arc<dyn Connection>>,
        config: SqlConfig,
    ) -> Self {
        Self {
            source,
            held: Mutex::new(held),
            cache_connection: AtomicBool::new(false),
            cache_statements: AtomicBool::new(config.cache_statements),
            within_batch: AtomicBool::new(false),
            named: NamedQueryCache::new(config.enable_named_queries, config.cache_named_queries),
            statements: StatementCache::new(),
            statement_options: config.statement_options,
            null_handling: config.null_handling,
            configure_statement: RwLock::new(None),
            update_count: AtomicI64::new(0),
        }
    }

    #[must_use]
    pub fn is_cache_statements(&self) -> bool {
        self.cache_statements.load(Ordering::Acquire)
    }

    /// Turn statement caching on or off.
    ///
    /// Turning it off closes every cached statement and, unless a
    /// connection-caching scope is active, the held datasource connection.
    pub fn set_cache_statements(&self, enabled: bool) {
        self.cache_statements.store(enabled, Ordering::Release);
        if !enabled {
            self.clear_statement_cache();
            if !self.is_cache_connection() {
                self.discard_held_connection();
            }
        }
    }

    #[must_use]
    pub fn is_cache_connection(&self) -> bool {
        self.cache_connection.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_cache_named_queries(&self) -> bool {
        self.named.is_caching()
    }

    pub fn set_cache_named_queries(&self, enabled: bool) {
        self.named.set_caching(enabled);
    }

    #[must_use]
    pub fn is_enable_named_queries(&self) -> bool {
        self.named.is_enabled()
    }

    pub fn set_enable_named_queries(&self, enabled: bool) {
        self.named.set_enabled(enabled);
    }

    /// True while a `with_batch` / `with_prepared_batch` body is running.
    #[must_use]
    pub fn is_within_batch(&self) -> bool {
        self.within_batch.load(Ordering::Acquire)
    }

    pub(crate) fn enter_batch(&self) -> BatchFlag<'_> {
        let saved = self.within_batch.swap(true, Ordering::AcqRel);
        BatchFlag { sql: self, saved }
    }

    #[must_use]
    pub fn statement_options(&self) -> StatementOptions {
        self.statement_options
    }

    /// Update count of the last `execute`/`execute_update`/`call`.
    #[must_use]
    pub fn update_count(&self) -> i64 {
        self.update_count.load(Ordering::Acquire)
    }

    pub(crate) fn record_update_count(&self, count: i64) {
        self.update_count.store(count, Ordering::Release);
    }

    /// Install a hook run on every statement the facade creates from now on,
    /// e.g. to set a query timeout or fetch size.
    pub fn with_statement<F>(&self, hook: F)
    where
        F: Fn(&mut dyn Statement) + Send + Sync + 'static,
    {
        self.replace_statement_hook(Some(Arc::new(hook)));
    }

    pub fn clear_statement_hook(&self) {
        self.replace_statement_hook(None);
    }

    fn replace_statement_hook(&self, hook: Option<StatementHook>) {
        match self.configure_statement.write() {
            Ok(mut slot) => *slot = hook,
            Err(poisoned) => *poisoned.into_inner() = hook,
        }
    }

    /// Number of statements currently held in the statement cache.
    #[must_use]
    pub fn cached_statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Number of memoised named-placeholder scans.
    #[must_use]
    pub fn cached_named_query_count(&self) -> usize {
        self.named.len()
    }

    /// Close and evict every cached statement.
    pub fn clear_statement_cache(&self) {
        let failures = self.statements.clear();
        if failures > 0 {
            tracing::debug!(failures, "Some cached statements failed to close");
        }
    }

    /// Keep one connection open for every call made inside `body`.
    ///
    /// # Errors
    /// Returns the error of `body`, or of acquiring the connection.
    pub fn cache_connection<R, F>(&self, body: F) -> Result<R, SqlFacadeError>
    where
        F: FnOnce(&Sql) -> Result<R, SqlFacadeError>,
    {
        let scope = Scope::enter(self, ScopeKind::Connection)?;
        let outcome = body(self);
        drop(scope);
        outcome
    }

    /// Reuse one connection and its prepared statements for every call in `body`.
    ///
    /// When caching was off before the scope, the statements are closed on exit.
    ///
    /// # Errors
    /// Returns the error of `body`, or of acquiring the connection.
    pub fn cache_statements<R, F>(&self, body: F) -> Result<R, SqlFacadeError>
    where
        F: FnOnce(&Sql) -> Result<R, SqlFacadeError>,
    {
        let scope = Scope::enter(self, ScopeKind::Statements)?;
        let outcome = body(self);
        drop(scope);
        outcome
    }

    /// Run `body` in a transaction on one held connection.
    ///
    /// Commits when `body` succeeds. Otherwise rolls back and returns the
    /// original error; a failed rollback is logged, not returned.
    ///
    /// # Errors
    /// Returns the error of `body`, of the commit, or of switching the
    /// connection out of auto-commit.
    pub fn with_transaction<R, F>(&self, body: F) -> Result<R, SqlFacadeError>
    where
        F: FnOnce(&Sql) -> Result<R, SqlFacadeError>,
    {
        let scope = Scope::enter(self, ScopeKind::Connection)?;
        let conn = Arc::clone(&scope.connection);
        let saved_auto_commit = conn.auto_commit()?;
        if saved_auto_commit {
            conn.set_auto_commit(false)?;
        }

        let outcome = body(self).and_then(|value| conn.commit().map(|()| value));
        if let Err(err) = &outcome {
            tracing::warn!(error = %err, "Rolling back due to failure in transaction");
            if let Err(rollback_err) = conn.rollback() {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
        }
        if saved_auto_commit && let Err(err) = conn.set_auto_commit(true) {
            tracing::warn!(error = %err, "Failed to restore auto-commit");
        }
        drop(scope);
        outcome
    }

    /// Commit on the held connection; a logged no-op without one.
    ///
    /// # Errors
    /// Returns the driver's commit failure.
    pub fn commit(&self) -> Result<(), SqlFacadeError> {
        match self.connection() {
            Some(conn) => conn.commit().inspect_err(|err| {
                tracing::warn!(error = %err, "Commit failed on held connection");
            }),
            None => {
                tracing::info!("Commit ignored: no held connection outside with_transaction or cache_connection");
                Ok(())
            }
        }
    }

    /// Roll back on the held connection; a logged no-op without one.
    ///
    /// # Errors
    /// Returns the driver's rollback failure.
    pub fn rollback(&self) -> Result<(), SqlFacadeError> {
        match self.connection() {
            Some(conn) => conn.rollback().inspect_err(|err| {
                tracing::warn!(error = %err, "Rollback failed on held connection");
            }),
            None => {
                tracing::info!("Rollback ignored: no held connection outside with_transaction or cache_connection");
                Ok(())
            }
        }
    }

    /// The currently held connection, if any.
    #[must_use]
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        match self.held.lock() {
            Ok(held) => held.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Clear both caches and close the held datasource connection.
    ///
    /// A caller-supplied connection stays open and keeps serving the facade.
    pub fn close(&self) {
        self.named.clear();
        self.clear_statement_cache();
        self.discard_held_connection();
    }
}

impl fmt::Debug for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sql")
            .field("data_source", &self.source.is_data_source())
            .field("cache_connection", &self.is_cache_connection())
            .field("cache_statements", &self.is_cache_statements())
            .field("within_batch", &self.is_within_batch())
            .field("named", &self.named)
            .field("statements", &self.statements.len())
            .field("statement_options", &self.statement_options)
            .field("null_handling", &self.null_handling)
            .finish_non_exhaustive()
    }
}

/// Restores the batch flag when a batch body ends.
pub(crate) struct BatchFlag<'a> {
    sql: &'a Sql,
    saved: bool,
}

impl Drop for BatchFlag<'_> {
    fn drop(&mut self) {
        self.sql.within_batch.store(self.saved, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Connection,
    Statements,
}

/// Raises a caching flag and holds a connection until dropped.
///
/// On exit the flag is restored, a statement cache populated only for this
/// scope is cleared, and the connection is closed unless an outer scope
/// still retains it.
struct Scope<'a> {
    sql: &'a Sql,
    kind: ScopeKind,
    saved: bool,
    connection: Arc<dyn Connection>,
}

impl<'a> Scope<'a> {
    fn enter(sql: &'a Sql, kind: ScopeKind) -> Result<Self, SqlFacadeError> {
        let flag = match kind {
            ScopeKind::Connection => &sql.cache_connection,
            ScopeKind::Statements => &sql.cache_statements,
        };
        let saved = flag.swap(true, Ordering::AcqRel);
        match sql.acquire_connection() {
            Ok(connection) => Ok(Self {
                sql,
                kind,
                saved,
                connection,
            }),
            Err(err) => {
                flag.store(saved, Ordering::Release);
                Err(err)
            }
        }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        let sql = self.sql;
        match self.kind {
            ScopeKind::Connection => sql.cache_connection.store(self.saved, Ordering::Release),
            ScopeKind::Statements => {
                sql.cache_statements.store(self.saved, Ordering::Release);
                if !self.saved {
                    sql.clear_statement_cache();
                }
            }
        }
        if !sql.is_cache_connection() && !sql.is_cache_statements() {
            if sql.is_held(&self.connection) {
                sql.discard_held_connection();
            } else {
                sql.release_connection(&self.connection);
            }
        }
    }
}
