//! Accepted-rule cache shared by the synthesis sessions of one planning run.

use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Rules accepted so far, keyed by the identifier set they were built for.
///
/// Each key owns a [`OnceCell`], so concurrent sessions for the same set wait
/// on one proposer loop instead of running their own. A failed session leaves
/// its cell empty and the next caller retries. Cloning shares the cache.
#[derive(Debug, Clone, Default)]
pub struct RuleCache {
    cells: Arc<Mutex<HashMap<String, Arc<OnceCell<String>>>>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a set of identifiers: SHA-256 over the sorted, distinct
    /// identifiers joined with `,`. Input order and duplicates do not matter.
    pub fn key<S: AsRef<str>>(identifiers: &[S]) -> String {
        let distinct: BTreeSet<&str> = identifiers.iter().map(|s| s.as_ref()).collect();
        let joined = distinct.into_iter().collect::<Vec<_>>().join(",");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Cell for `key`, created empty on first use.
    pub(crate) fn cell(&self, key: &str) -> Arc<OnceCell<String>> {
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Accepted rule for `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Number of accepted rules.
    pub fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_order_and_duplicates() {
        let a = RuleCache::key(&["orders_02", "orders_01"]);
        let b = RuleCache::key(&["orders_01", "orders_02", "orders_01"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, RuleCache::key(&["orders_01"]));
    }

    #[tokio::test]
    async fn test_cell_is_shared_per_key() {
        let cache = RuleCache::new();
        let key = RuleCache::key(&["a", "b"]);
        assert!(cache.get(&key).is_none());

        cache
            .cell(&key)
            .get_or_init(|| async { "?".to_string() })
            .await;
        assert_eq!(cache.get(&key).as_deref(), Some("?"));

        let clone = cache.clone();
        assert_eq!(clone.len(), 1);
        assert!(clone.cell(&key).initialized());
    }

    #[tokio::test]
    async fn test_failed_init_leaves_cell_empty() {
        let cache = RuleCache::new();
        let key = RuleCache::key(&["x"]);
        let cell = cache.cell(&key);
        let res = cell
            .get_or_try_init(|| async { Err::<String, &str>("nope") })
            .await;
        assert!(res.is_err());
        assert!(!cell.initialized());
        assert!(cache.is_empty());
    }
}
