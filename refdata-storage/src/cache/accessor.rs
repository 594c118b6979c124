//! Typed read accessor over a live cache.

use std::sync::Arc;

use refdata_core::RefDataEntity;

use super::live::LiveCache;

/// By-identity lookups against a shared [`LiveCache`].
///
/// Holds no state of its own; read call-sites depend on this handle rather
/// than on whoever owns and reloads the cache.
pub struct RefData<T: RefDataEntity> {
    cache: Arc<LiveCache<T>>,
}

impl<T: RefDataEntity> RefData<T> {
    pub fn new(cache: Arc<LiveCache<T>>) -> Self {
        Self { cache }
    }

    /// Latest active version of `identity` as of the cache's last reload.
    pub fn get(&self, identity: &str) -> Option<Arc<T>> {
        self.cache.get(identity)
    }

    /// The cache this accessor reads from.
    pub fn cache(&self) -> &Arc<LiveCache<T>> {
        &self.cache
    }
}

impl<T: RefDataEntity> Clone for RefData<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}
