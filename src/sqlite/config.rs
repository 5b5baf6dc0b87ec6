use std::sync::Arc;
use std::time::Duration;

use crate::driver::{Connection, DataSource};
use crate::error::SqlFacadeError;

use super::connection::SqliteConnection;

/// Opens a fresh `SQLite` connection for every checkout.
///
/// `":memory:"` works, but each checkout then sees its own empty database;
/// hold the connection with `Sql::cache_connection` or use
/// `Sql::from_connection` to share one.
#[derive(Debug, Clone)]
pub struct SqliteDataSource {
    pub db_path: String,
    pub wal: bool,
    pub busy_timeout: Option<Duration>,
}

impl SqliteDataSource {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            wal: false,
            busy_timeout: None,
        }
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteDataSourceBuilder {
        SqliteDataSourceBuilder {
            source: Self::new(db_path),
        }
    }

    /// Open and configure a connection.
    ///
    /// # Errors
    /// Returns `SqlFacadeError::ConnectionError` if the file cannot be opened,
    /// or the rusqlite error if a pragma fails.
    pub fn open(&self) -> Result<SqliteConnection, SqlFacadeError> {
        let conn = rusqlite::Connection::open(&self.db_path).map_err(|e| {
            SqlFacadeError::ConnectionError(format!(
                "Failed to open SQLite database {}: {e}",
                self.db_path
            ))
        })?;
        if self.wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        tracing::debug!(db_path = %self.db_path, wal = self.wal, "Opened SQLite connection");
        Ok(SqliteConnection::new(conn))
    }
}

impl DataSource for SqliteDataSource {
    fn get_connection(&self) -> Result<Arc<dyn Connection>, SqlFacadeError> {
        Ok(Arc::new(self.open()?))
    }
}

/// Fluent builder for [`SqliteDataSource`].
#[derive(Debug, Clone)]
pub struct SqliteDataSourceBuilder {
    source: SqliteDataSource,
}

impl SqliteDataSourceBuilder {
    #[must_use]
    pub fn wal(mut self, enabled: bool) -> Self {
        self.source.wal = enabled;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.source.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteDataSource {
        self.source
    }
}
