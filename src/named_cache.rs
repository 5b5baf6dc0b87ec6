use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::SqlFacadeError;
use crate::translation::{NamedSql, scan_named_params};

/// Memoises placeholder scans keyed by the caller's SQL text.
///
/// Entries live until [`NamedQueryCache::clear`]; only statements that
/// actually contain named placeholders are stored.
#[derive(Debug)]
pub struct NamedQueryCache {
    entries: Mutex<HashMap<String, Arc<NamedSql>>>,
    enabled: AtomicBool,
    caching: AtomicBool,
}

impl NamedQueryCache {
    #[must_use]
    pub fn new(enabled: bool, caching: bool) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            enabled: AtomicBool::new(enabled),
            caching: AtomicBool::new(caching),
        }
    }

    /// Scan `sql`, consulting the cache first when caching is on.
    ///
    /// Returns `Ok(None)` when named queries are disabled or the text has no
    /// named placeholder.
    ///
    /// # Errors
    /// Returns `SqlFacadeError::Scan` for malformed quoting.
    pub fn resolve(&self, sql: &str) -> Result<Option<Arc<NamedSql>>, SqlFacadeError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        if !self.is_caching() {
            return Ok(scan_named_params(sql)?.map(Arc::new));
        }

        let mut entries = self.entries.lock()?;
        if let Some(hit) = entries.get(sql) {
            return Ok(Some(Arc::clone(hit)));
        }
        let scanned = scan_named_params(sql)?.map(Arc::new);
        if let Some(named) = &scanned {
            entries.insert(sql.to_string(), Arc::clone(named));
        }
        Ok(scanned)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn is_caching(&self) -> bool {
        self.caching.load(Ordering::Acquire)
    }

    pub fn set_caching(&self, caching: bool) {
        self.caching.store(caching, Ordering::Release);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.entries.lock() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl Default for NamedQueryCache {
    fn default() -> Self {
        Self::new(true, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQL: &str = "select * from t where a = :a and b = ?2.b";

    #[test]
    fn hits_return_the_same_entry() {
        let cache = NamedQueryCache::default();
        let first = cache.resolve(SQL).unwrap().unwrap();
        let second = cache.resolve(SQL).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn plain_sql_is_never_stored() {
        let cache = NamedQueryCache::default();
        assert!(cache.resolve("select * from t where a = ?").unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_caching_rescans_without_storing() {
        let cache = NamedQueryCache::new(true, false);
        let first = cache.resolve(SQL).unwrap().unwrap();
        let second = cache.resolve(SQL).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_named_queries_skip_scanning() {
        let cache = NamedQueryCache::new(false, true);
        assert!(cache.resolve(SQL).unwrap().is_none());
        assert!(cache.resolve("select 'unterminated").unwrap().is_none());
    }

    #[test]
    fn scan_errors_surface_and_are_not_cached() {
        let cache = NamedQueryCache::default();
        let err = cache.resolve("select 'oops :a").unwrap_err();
        assert!(matches!(err, SqlFacadeError::Scan(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_the_store() {
        let cache = NamedQueryCache::default();
        cache.resolve(SQL).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_resolves_share_one_entry() {
        let cache = Arc::new(NamedQueryCache::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.resolve(SQL).unwrap().unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }
}
