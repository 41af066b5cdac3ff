//! Fetch-once cache over any `StateFetcher`

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;

use crate::error::Result;
use crate::fetcher::StateFetcher;

/// Remembers every successful fetch for the lifetime of the wrapper
///
/// One instance lives for one job; nothing is persisted. Failures are not
/// cached, so a later call for the same key tries again.
#[derive(Debug)]
pub struct CachedFetcher<F> {
    origin: F,
    cache: Mutex<HashMap<String, Bytes>>,
}

impl<F: StateFetcher> CachedFetcher<F> {
    pub fn new(origin: F) -> Self {
        Self {
            origin,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct keys fetched so far
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: StateFetcher> StateFetcher for CachedFetcher<F> {
    fn fetch(&self, key: &str) -> Result<Bytes> {
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            tracing::debug!(key, "state cache hit");
            return Ok(hit.clone());
        }

        let data = self.origin.fetch(key)?;
        tracing::debug!(key, bytes = data.len(), "state fetched");

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), data.clone());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl StateFetcher for CountingFetcher {
        fn fetch(&self, key: &str) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if key.starts_with("missing/") {
                return Err(StateError::InvalidKey {
                    key: key.to_string(),
                    reason: "not found".to_string(),
                });
            }
            Ok(Bytes::from(format!("state of {key}")))
        }
    }

    #[test]
    fn test_fetches_once_per_key() {
        let cached = CachedFetcher::new(CountingFetcher::default());

        assert_eq!(cached.fetch("b/one").unwrap(), "state of b/one");
        assert_eq!(cached.fetch("b/one").unwrap(), "state of b/one");
        assert_eq!(cached.origin.calls.load(Ordering::SeqCst), 1);

        cached.fetch("b/two").unwrap();
        assert_eq!(cached.origin.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.len(), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cached = CachedFetcher::new(CountingFetcher::default());

        assert!(cached.fetch("missing/x").is_err());
        assert!(cached.fetch("missing/x").is_err());
        assert_eq!(cached.origin.calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty());
    }
}
