use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::StatementOptions;
use crate::driver::{Connection, Statement, StatementKind};
use crate::error::SqlFacadeError;

use super::statement::SqliteStatement;

/// Native connection shared by a connection and the statements created from it.
/// `None` once closed.
pub(crate) type SharedSqliteConnection = Arc<Mutex<Option<rusqlite::Connection>>>;

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

pub(crate) fn with_native<R, F>(handle: &SharedSqliteConnection, func: F) -> Result<R, SqlFacadeError>
where
    F: FnOnce(&rusqlite::Connection) -> Result<R, SqlFacadeError>,
{
    let guard = handle.lock()?;
    match guard.as_ref() {
        Some(conn) => func(conn),
        None => Err(SqlFacadeError::ConnectionError(
            "SQLite connection is closed".into(),
        )),
    }
}

/// `SQLite` connection with an emulated auto-commit switch.
///
/// Auto-commit is on by default. Switching it off opens a transaction;
/// `commit` and `rollback` then end it and immediately open the next one.
/// Switching it back on commits whatever is pending.
pub struct SqliteConnection {
    handle: SharedSqliteConnection,
    auto_commit: AtomicBool,
}

impl SqliteConnection {
    #[must_use]
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            handle: Arc::new(Mutex::new(Some(conn))),
            auto_commit: AtomicBool::new(true),
        }
    }

    /// Open a connection without pragmas.
    ///
    /// # Errors
    /// Returns the rusqlite error if the database cannot be opened.
    pub fn open(db_path: &str) -> Result<Self, SqlFacadeError> {
        Ok(Self::new(rusqlite::Connection::open(db_path)?))
    }

    /// Run `func` against the native connection.
    ///
    /// # Errors
    /// Returns `SqlFacadeError::ConnectionError` once the connection is closed,
    /// or whatever `func` returns.
    pub fn with_connection<R, F>(&self, func: F) -> Result<R, SqlFacadeError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<R, SqlFacadeError>,
    {
        with_native(&self.handle, func)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.lock().map_or(true, |guard| guard.is_none())
    }

    fn execute_control(&self, sql: &str) -> Result<(), SqlFacadeError> {
        self.with_connection(|conn| conn.execute_batch(sql).map_err(SqlFacadeError::from))
    }

    fn rollback_with_busy_retries(&self) -> Result<(), SqlFacadeError> {
        for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
            let result = self.execute_control("ROLLBACK");
            match &result {
                Err(SqlFacadeError::SqliteError(rusqlite::Error::SqliteFailure(err, _)))
                    if err.code == rusqlite::ErrorCode::DatabaseBusy
                        && idx + 1 < ROLLBACK_BUSY_RETRIES.len() =>
                {
                    thread::sleep(delay);
                }
                _ => return result,
            }
        }
        Err(SqlFacadeError::ExecutionError(
            "rollback retries exhausted".into(),
        ))
    }

    fn ensure_manual_commit(&self, action: &str) -> Result<(), SqlFacadeError> {
        if self.auto_commit.load(Ordering::Acquire) {
            Err(SqlFacadeError::ExecutionError(format!(
                "cannot {action} while auto-commit is enabled"
            )))
        } else {
            Ok(())
        }
    }
}

impl Connection for SqliteConnection {
    fn create_statement(
        &self,
        kind: StatementKind,
        sql: Option<&str>,
        options: StatementOptions,
    ) -> Result<Box<dyn Statement>, SqlFacadeError> {
        if kind == StatementKind::Callable {
            return Err(SqlFacadeError::Unimplemented(
                "stored procedure calls are not supported by SQLite".into(),
            ));
        }
        let text = match (kind, sql) {
            (StatementKind::Plain, _) => None,
            (_, Some(text)) => {
                // Surface syntax errors when the statement is created.
                self.with_connection(|conn| {
                    conn.prepare_cached(text)?;
                    Ok(())
                })?;
                Some(text.to_string())
            }
            (_, None) => {
                return Err(SqlFacadeError::ExecutionError(
                    "prepared statements need SQL text".into(),
                ));
            }
        };
        Ok(Box::new(SqliteStatement::new(
            Arc::clone(&self.handle),
            kind,
            text,
            options,
        )))
    }

    fn auto_commit(&self) -> Result<bool, SqlFacadeError> {
        Ok(self.auto_commit.load(Ordering::Acquire))
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<(), SqlFacadeError> {
        let current = self.auto_commit.load(Ordering::Acquire);
        if current == enabled {
            return Ok(());
        }
        self.execute_control(if enabled { "COMMIT" } else { "BEGIN" })?;
        self.auto_commit.store(enabled, Ordering::Release);
        Ok(())
    }

    fn commit(&self) -> Result<(), SqlFacadeError> {
        self.ensure_manual_commit("commit")?;
        self.execute_control("COMMIT; BEGIN")
    }

    fn rollback(&self) -> Result<(), SqlFacadeError> {
        self.ensure_manual_commit("rollback")?;
        self.rollback_with_busy_retries()?;
        self.execute_control("BEGIN")
    }

    fn close(&self) -> Result<(), SqlFacadeError> {
        let taken = self.handle.lock()?.take();
        match taken {
            Some(conn) => conn.close().map_err(|(_, err)| SqlFacadeError::from(err)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("closed", &self.is_closed())
            .field("auto_commit", &self.auto_commit.load(Ordering::Acquire))
            .finish()
    }
}
