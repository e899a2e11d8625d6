//! Store trait for abstracted key-value operations.

use async_trait::async_trait;
use cachet_core::{CacheError, CacheResult};
use std::time::Duration;

/// Backend-specific write conditions passed through by `set`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Only write when the key does not exist (`NX`).
    pub only_if_absent: bool,
    /// Only write when the key already exists (`XX`).
    pub only_if_exists: bool,
    /// Keep the current TTL instead of clearing it (`KEEPTTL`).
    pub keep_ttl: bool,
}

impl SetOptions {
    /// Write only when the key is absent.
    #[must_use]
    pub const fn if_absent() -> Self {
        Self {
            only_if_absent: true,
            only_if_exists: false,
            keep_ttl: false,
        }
    }

    /// Write only when the key exists.
    #[must_use]
    pub const fn if_exists() -> Self {
        Self {
            only_if_absent: false,
            only_if_exists: true,
            keep_ttl: false,
        }
    }

    /// Keeps the existing TTL on overwrite.
    #[must_use]
    pub const fn keep_ttl(mut self) -> Self {
        self.keep_ttl = true;
        self
    }

    /// Rejects combinations no backend can honour.
    pub fn validate(&self, expire: Option<Duration>) -> CacheResult<()> {
        if let Some(ttl) = expire {
            validate_expire(ttl)?;
        }
        if self.only_if_absent && self.only_if_exists {
            return Err(CacheError::configuration(
                "only_if_absent and only_if_exists are mutually exclusive",
            ));
        }
        if self.keep_ttl && expire.is_some() {
            return Err(CacheError::configuration(
                "keep_ttl cannot be combined with an explicit expiry",
            ));
        }
        Ok(())
    }
}

/// Longest expiry a store accepts, one hundred years.
pub const MAX_EXPIRE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Rejects expiries longer than [`MAX_EXPIRE`].
pub fn validate_expire(ttl: Duration) -> CacheResult<()> {
    if ttl > MAX_EXPIRE {
        return Err(CacheError::configuration(format!(
            "expiry of {}s exceeds the maximum of {}s",
            ttl.as_secs(),
            MAX_EXPIRE.as_secs()
        )));
    }
    Ok(())
}

/// Key-value capability behind the cache facade.
///
/// A missing key is `Ok(None)` / `Ok(false)`, never an error. Connectivity
/// failures surface as [`CacheError::Connection`] and are not retried here.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the stored bytes, or `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Writes a value, overwriting any previous one.
    ///
    /// Without `expire` the entry persists until deleted or evicted.
    /// Returns `false` when a condition in `options` prevented the write.
    async fn set(
        &self,
        key: &str,
        value: &[u8],
        expire: Option<Duration>,
        options: SetOptions,
    ) -> CacheResult<bool>;

    /// Checks if a key exists.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Sets the TTL of an existing key without touching its value.
    ///
    /// Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Deletes a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Deletes every key starting with `prefix`, returning how many went.
    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64>;

    /// Lists keys containing `fragment`, sorted.
    async fn keys(&self, fragment: &str) -> CacheResult<Vec<String>>;

    /// Round-trips to the backend.
    async fn ping(&self) -> CacheResult<()>;

    /// Releases backend resources.
    async fn close(&self);

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
