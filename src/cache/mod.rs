//! Result cache
//!
//! A namespaced key/value store with per-entry TTL. Service handlers use it
//! to avoid re-querying upstream APIs; the HTTP layer uses it to remember
//! badge fingerprints for conditional GET.
//!
//! Backends are selected by URI scheme:
//!
//! | URI      | Backend            |
//! |----------|--------------------|
//! | `mem://` | [`InMemoryCache`]  |

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::errors::{CacheError, CacheResult};

pub mod memory;

pub use memory::InMemoryCache;

/// Contract shared by all cache backends
///
/// Operations are synchronous and never suspend, so a caller that is
/// cancelled can never leave an entry half-written.
pub trait Cache: Send + Sync {
    /// Value stored under `namespace`/`key`, or `None` if absent or expired
    fn get(&self, namespace: &str, key: &str) -> CacheResult<Option<String>>;

    /// Store `value`, replacing any previous entry, expiring after `ttl`
    fn set(&self, namespace: &str, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove an entry; removing a missing entry is not an error
    fn delete(&self, namespace: &str, key: &str) -> CacheResult<()>;

    /// Drop every expired entry, returning how many were removed
    fn purge_expired(&self) -> CacheResult<usize>;
}

pub type SharedCache = Arc<dyn Cache>;

/// Open a cache backend from its URI
pub fn from_uri(uri: &str) -> CacheResult<SharedCache> {
    let parsed = Url::parse(uri).map_err(|e| CacheError::InvalidUri {
        uri: uri.to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "mem" => Ok(Arc::new(InMemoryCache::new())),
        other => Err(CacheError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}
