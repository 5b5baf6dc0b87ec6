//! Connection and statement lifecycle: when handles are created, reused,
//! retained by the caching policy, or closed.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::driver::{Connection, DataSource, RowCursor, Statement};
use crate::error::SqlFacadeError;
use crate::facade::Sql;
use crate::statement::{StatementCommand, StatementHandle, StatementKey};

/// Where the facade gets its connections from.
#[derive(Clone)]
pub(crate) enum ConnectionSource {
    /// Fresh connection per call unless a caching scope holds one.
    DataSource(Arc<dyn DataSource>),
    /// Caller-owned connection; never closed by the facade.
    Direct(Arc<dyn Connection>),
}

impl ConnectionSource {
    pub(crate) fn is_data_source(&self) -> bool {
        matches!(self, ConnectionSource::DataSource(_))
    }
}

impl Sql {
    /// Check out a connection for one call.
    ///
    /// While statement or connection caching is active the held connection is
    /// reused (and populated on first use); otherwise a fresh one comes from
    /// the datasource.
    pub(crate) fn acquire_connection(&self) -> Result<Arc<dyn Connection>, SqlFacadeError> {
        let retain = self.is_cache_statements() || self.is_cache_connection();
        match &self.source {
            ConnectionSource::Direct(conn) => Ok(Arc::clone(conn)),
            ConnectionSource::DataSource(ds) if retain => {
                let mut held = self.held.lock()?;
                if let Some(conn) = held.as_ref() {
                    return Ok(Arc::clone(conn));
                }
                let conn = ds.get_connection()?;
                *held = Some(Arc::clone(&conn));
                Ok(conn)
            }
            ConnectionSource::DataSource(ds) => ds.get_connection(),
        }
    }

    /// Hand a connection back; closes it unless a caching scope retains it.
    pub(crate) fn release_connection(&self, conn: &Arc<dyn Connection>) {
        if !self.source.is_data_source() || self.is_cache_connection() {
            return;
        }
        if self.is_cache_statements() && self.is_held(conn) {
            return;
        }
        if let Err(err) = conn.close() {
            tracing::trace!(error = %err, "Ignoring failure closing connection");
        }
    }

    pub(crate) fn is_held(&self, conn: &Arc<dyn Connection>) -> bool {
        match self.held.lock() {
            Ok(held) => held.as_ref().is_some_and(|h| Arc::ptr_eq(h, conn)),
            Err(_) => false,
        }
    }

    /// Drop the held datasource connection, closing it.
    pub(crate) fn discard_held_connection(&self) {
        if !self.source.is_data_source() {
            return;
        }
        let taken = match self.held.lock() {
            Ok(mut held) => held.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(conn) = taken
            && let Err(err) = conn.close()
        {
            tracing::trace!(error = %err, "Ignoring failure closing held connection");
        }
    }

    /// Run the statement-configuration hook on a newly created statement.
    pub(crate) fn configure(&self, statement: &mut dyn Statement) {
        let hook = match self.configure_statement.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(hook) = hook {
            hook(statement);
        }
    }
}

thread_local! {
    /// Cached statements this thread is currently executing, by handle address.
    static STATEMENTS_IN_USE: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

fn handle_address(handle: &StatementHandle) -> usize {
    Arc::as_ptr(handle).cast::<()>() as usize
}

/// Marks `handle` as in use on this thread; false if it already was.
fn claim_on_this_thread(handle: &StatementHandle) -> bool {
    STATEMENTS_IN_USE.with(|in_use| in_use.borrow_mut().insert(handle_address(handle)))
}

fn release_on_this_thread(handle: &StatementHandle) {
    STATEMENTS_IN_USE.with(|in_use| {
        in_use.borrow_mut().remove(&handle_address(handle));
    });
}

struct AcquiredStatement {
    handle: StatementHandle,
    cached: bool,
}

/// Resources checked out by one facade call.
///
/// Dropping the context releases them in order: cursor, statement (unless it
/// lives in the statement cache), connection (unless retained).
pub(crate) struct ExecutionContext<'a> {
    sql: &'a Sql,
    connection: Arc<dyn Connection>,
    statement: Option<AcquiredStatement>,
    pub(crate) cursor: Option<Box<dyn RowCursor>>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn open(sql: &'a Sql) -> Result<Self, SqlFacadeError> {
        let connection = sql.acquire_connection()?;
        Ok(Self {
            sql,
            connection,
            statement: None,
            cursor: None,
        })
    }

    pub(crate) fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Fetch the statement for `sql` from the cache, or create it.
    ///
    /// A cached statement already executing further up this thread's stack
    /// (a row callback re-running the same SQL) cannot be shared, so the
    /// nested call gets an uncached statement of its own.
    pub(crate) fn acquire_statement(
        &mut self,
        command: StatementCommand,
        sql: &str,
    ) -> Result<StatementHandle, SqlFacadeError> {
        if !self.sql.is_cache_statements() {
            return self.create_statement(command, sql);
        }
        let facade = self.sql;
        let conn = Arc::clone(&self.connection);
        let key = StatementKey::new(command.kind_for(sql), sql);
        let (handle, created) = facade.statements.get_or_create(key, || {
            let mut stmt = command.create(conn.as_ref(), sql, facade.statement_options)?;
            facade.configure(stmt.as_mut());
            Ok(stmt)
        })?;
        if !claim_on_this_thread(&handle) {
            tracing::debug!(sql = %sql, "Cached statement busy on this thread, creating a fresh one");
            return self.create_statement(command, sql);
        }
        if !created {
            tracing::trace!(sql = %sql, "Reusing cached statement");
        }
        self.statement = Some(AcquiredStatement {
            handle: Arc::clone(&handle),
            cached: true,
        });
        Ok(handle)
    }

    /// Create a statement that is closed when this context ends, bypassing the cache.
    pub(crate) fn create_statement(
        &mut self,
        command: StatementCommand,
        sql: &str,
    ) -> Result<StatementHandle, SqlFacadeError> {
        let mut stmt = command.create(self.connection.as_ref(), sql, self.sql.statement_options)?;
        self.sql.configure(stmt.as_mut());
        let handle: StatementHandle = Arc::new(Mutex::new(stmt));
        self.statement = Some(AcquiredStatement {
            handle: Arc::clone(&handle),
            cached: false,
        });
        Ok(handle)
    }
}

impl Drop for ExecutionContext<'_> {
    fn drop(&mut self) {
        if let Some(mut cursor) = self.cursor.take()
            && let Err(err) = cursor.close()
        {
            tracing::trace!(error = %err, "Ignoring failure closing cursor");
        }
        if let Some(acquired) = self.statement.take() {
            if acquired.cached {
                release_on_this_thread(&acquired.handle);
            } else {
                let outcome = match acquired.handle.lock() {
                    Ok(mut stmt) => stmt.close(),
                    Err(poisoned) => poisoned.into_inner().close(),
                };
                if let Err(err) = outcome {
                    tracing::trace!(error = %err, "Ignoring failure closing statement");
                }
            }
        }
        self.sql.release_connection(&self.connection);
    }
}
