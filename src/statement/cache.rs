use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::driver::{Statement, StatementKind};
use crate::error::SqlFacadeError;

use super::StatementHandle;

/// Cache key: the final SQL text plus the statement flavour, so a plain and a
/// prepared statement for the same text never alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementKey {
    pub kind: StatementKind,
    pub sql: String,
}

impl StatementKey {
    pub fn new(kind: StatementKind, sql: impl Into<String>) -> Self {
        Self {
            kind,
            sql: sql.into(),
        }
    }
}

/// One live statement per distinct key, shared across calls.
#[derive(Default)]
pub struct StatementCache {
    entries: Mutex<HashMap<StatementKey, StatementHandle>>,
}

impl std::fmt::Debug for StatementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementCache")
            .field("len", &self.len())
            .finish()
    }
}

impl StatementCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `key`, creating it with `creator` on a miss.
    ///
    /// Creation runs under the cache lock so concurrent callers never create
    /// two statements for the same key. The boolean is `true` when the handle
    /// was created by this call.
    ///
    /// # Errors
    /// Propagates the creator's error; nothing is stored in that case.
    pub fn get_or_create<F>(
        &self,
        key: StatementKey,
        creator: F,
    ) -> Result<(StatementHandle, bool), SqlFacadeError>
    where
        F: FnOnce() -> Result<Box<dyn Statement>, SqlFacadeError>,
    {
        let mut entries = self.entries.lock()?;
        if let Some(handle) = entries.get(&key) {
            return Ok((Arc::clone(handle), false));
        }
        let handle: StatementHandle = Arc::new(Mutex::new(creator()?));
        entries.insert(key, Arc::clone(&handle));
        Ok((handle, true))
    }

    #[must_use]
    pub fn contains(&self, key: &StatementKey) -> bool {
        self.entries
            .lock()
            .is_ok_and(|entries| entries.contains_key(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict and close every cached statement.
    ///
    /// Handles are drained under the lock and closed outside it. A failure to
    /// close one statement is logged and does not stop the rest. Returns the
    /// number of statements whose close failed.
    pub fn clear(&self) -> usize {
        let drained: Vec<(StatementKey, StatementHandle)> = {
            let mut entries = match self.entries.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            entries.drain().collect()
        };

        let mut failures = 0;
        for (key, handle) in drained {
            let outcome = match handle.lock() {
                Ok(mut stmt) => stmt.close(),
                Err(poisoned) => poisoned.into_inner().close(),
            };
            if let Err(err) = outcome {
                failures += 1;
                tracing::info!(
                    sql = %key.sql,
                    error = %err,
                    "Failed to close cached statement; already closed?"
                );
            }
        }
        failures
    }
}
