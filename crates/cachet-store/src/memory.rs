//! In-process store.

use crate::{validate_expire, SetOptions, Store};
use async_trait::async_trait;
use cachet_core::{CacheError, CacheResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone)]
struct Entry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

fn deadline(now: Instant, ttl: Duration) -> CacheResult<Instant> {
    now.checked_add(ttl)
        .ok_or_else(|| CacheError::configuration(format!("expiry of {:?} is out of range", ttl)))
}

/// In-memory store with per-entry expiry.
///
/// Expired entries are dropped lazily, on the next access that sees them.
/// Uses the tokio clock, so paused-time tests can drive expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true when no live entries remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, now: Instant) {
        entries.retain(|_, e| e.is_live(now));
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.data.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        expire: Option<Duration>,
        options: SetOptions,
    ) -> CacheResult<bool> {
        options.validate(expire)?;

        let now = Instant::now();
        let mut entries = self.entries.write();
        let current = entries.get(key).filter(|e| e.is_live(now));

        if (options.only_if_absent && current.is_some())
            || (options.only_if_exists && current.is_none())
        {
            return Ok(false);
        }

        let expires_at = match expire {
            Some(ttl) => Some(deadline(now, ttl)?),
            None if options.keep_ttl => current.and_then(|e| e.expires_at),
            None => None,
        };

        entries.insert(
            key.to_string(),
            Entry {
                data: value.to_vec(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        validate_expire(ttl)?;
        let now = Instant::now();
        let expires_at = deadline(now, ttl)?;
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(expires_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        Self::purge_expired(&mut entries, now);

        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        let removed = (before - entries.len()) as u64;

        debug!(prefix = %prefix, removed, "Deleted keys by prefix");
        Ok(removed)
    }

    async fn keys(&self, fragment: &str) -> CacheResult<Vec<String>> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(k, e)| e.is_live(now) && k.contains(fragment))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn close(&self) {
        self.entries.write().clear();
        debug!("Memory store cleared on close");
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", b"one", None, SetOptions::default()).await.unwrap();
        store.set("k", b"two", None, SetOptions::default()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let store = MemoryStore::new();
        store.set("k", b"v", Some(TTL), SetOptions::default()).await.unwrap();
        assert!(store.exists("k").await.unwrap());

        tokio::time::advance(TTL + Duration::from_millis(1)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_without_expiry_persists() {
        let store = MemoryStore::new();
        store.set("k", b"v", None, SetOptions::default()).await.unwrap();
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_updates_ttl_and_keeps_value() {
        let store = MemoryStore::new();
        store.set("k", b"v", None, SetOptions::default()).await.unwrap();
        assert!(store.expire("k", TTL).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));

        tokio::time::advance(TTL * 2).await;
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_on_missing_key_is_signaled() {
        let store = MemoryStore::new();
        assert!(!store.expire("ghost", TTL).await.unwrap());
    }

    #[tokio::test]
    async fn test_only_if_absent() {
        let store = MemoryStore::new();
        assert!(store.set("k", b"a", None, SetOptions::if_absent()).await.unwrap());
        assert!(!store.set("k", b"b", None, SetOptions::if_absent()).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"a".to_vec()));
    }

    #[tokio::test]
    async fn test_only_if_exists() {
        let store = MemoryStore::new();
        assert!(!store.set("k", b"a", None, SetOptions::if_exists()).await.unwrap());
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_ttl_on_overwrite() {
        let store = MemoryStore::new();
        store.set("k", b"a", Some(TTL), SetOptions::default()).await.unwrap();
        store
            .set("k", b"b", None, SetOptions::default().keep_ttl())
            .await
            .unwrap();

        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let store = MemoryStore::new();
        store.set("k", b"v", None, SetOptions::default()).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_prefix() {
        let store = MemoryStore::new();
        for key in ["router:a", "router:b", "other:c"] {
            store.set(key, b"v", None, SetOptions::default()).await.unwrap();
        }

        assert_eq!(store.delete_by_prefix("router").await.unwrap(), 2);
        assert!(!store.exists("router:a").await.unwrap());
        assert!(!store.exists("router:b").await.unwrap());
        assert!(store.exists("other:c").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_by_fragment_sorted() {
        let store = MemoryStore::new();
        for key in ["ns:items:2", "ns:items:1", "ns:users:1"] {
            store.set(key, b"v", None, SetOptions::default()).await.unwrap();
        }
        assert_eq!(
            store.keys("items").await.unwrap(),
            vec!["ns:items:1".to_string(), "ns:items:2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_oversized_expiry_is_rejected_not_panicking() {
        let store = MemoryStore::new();
        let huge = Duration::from_secs(u64::MAX);

        let err = store.set("k", b"v", Some(huge), SetOptions::default()).await.unwrap_err();
        assert!(matches!(err, CacheError::Configuration(_)));
        assert!(store.is_empty());

        store.set("k", b"v", None, SetOptions::default()).await.unwrap();
        assert!(store.expire("k", huge).await.is_err());
        assert!(store.expire("k", crate::MAX_EXPIRE).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_close_clears() {
        let store = MemoryStore::new();
        store.set("k", b"v", None, SetOptions::default()).await.unwrap();
        store.close().await;
        assert!(store.is_empty());
    }
}
