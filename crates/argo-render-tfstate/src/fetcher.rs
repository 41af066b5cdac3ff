//! Raw state retrieval

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Returns the raw bytes stored under a state key
///
/// Implementations are blocking; template expansion calls them from inside
/// a synchronous render.
pub trait StateFetcher: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Bytes>;
}

impl<T: StateFetcher + ?Sized> StateFetcher for Arc<T> {
    fn fetch(&self, key: &str) -> Result<Bytes> {
        (**self).fetch(key)
    }
}

impl<T: StateFetcher + ?Sized> StateFetcher for Box<T> {
    fn fetch(&self, key: &str) -> Result<Bytes> {
        (**self).fetch(key)
    }
}
