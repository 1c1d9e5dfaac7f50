//! Key-value stores with per-entry expiry that hold session records.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{Expiry, future::Cache};

use crate::error::CacheError;

/// Default capacity of [`MemoryCache`].
pub const DEFAULT_MAX_ENTRIES: u64 = 100_000;

/// A key-value store with TTL semantics.
///
/// `get` distinguishes a miss (`Ok(None)`) from an unreachable store (`Err`), so
/// callers never mistake a backend outage for a logged-out user.
#[async_trait]
pub trait TokenCache: Send + Sync + 'static {
    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Fetch the live value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
}

/// Round a TTL up to whole seconds, as key-value stores count expiry in seconds.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process store backed by a `moka` cache.
///
/// Reads do not extend an entry's lifetime; only writes reset the TTL.
#[derive(Clone)]
pub struct MemoryCache {
    cache: Cache<String, Entry>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    #[must_use]
    pub fn with_max_entries(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Number of live entries (approximate, as reported by moka).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

#[async_trait]
impl TokenCache for MemoryCache {
    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::Backend("ttl must be positive".into()));
        }
        self.cache.insert(key.to_string(), Entry { value, ttl }).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }
}

/// Redis store using `SETEX`/`GET` over a multiplexed connection manager.
#[cfg(feature = "redis")]
#[derive(Clone)]
pub struct RedisCache {
    manager: redis::aio::ConnectionManager,
}

#[cfg(feature = "redis")]
impl RedisCache {
    /// Connect to the Redis server at `url` (for example `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|err| CacheError::Backend(err.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|err| CacheError::Backend(err.to_string()))?;
        Ok(Self { manager })
    }

    pub fn from_manager(manager: redis::aio::ConnectionManager) -> Self {
        Self { manager }
    }
}

#[cfg(feature = "redis")]
impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl TokenCache for RedisCache {
    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        use redis::AsyncCommands as _;

        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl))
            .await
            .map_err(|err| CacheError::Backend(err.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        use redis::AsyncCommands as _;

        let mut conn = self.manager.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|err| CacheError::Backend(err.to_string()))
    }
}
