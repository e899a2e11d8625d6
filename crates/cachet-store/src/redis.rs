//! Redis-backed store.

use crate::{validate_expire, SetOptions, Store};
use async_trait::async_trait;
use cachet_config::CacheConfig;
use cachet_core::{CacheError, CacheResult};
use deadpool_redis::redis::{self, ErrorKind, RedisError};
use deadpool_redis::{Config, Pool, PoolError, Runtime};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

/// Keys requested per SCAN round trip.
const SCAN_COUNT: usize = 100;

/// Keys removed per DEL command.
const DELETE_BATCH: usize = 500;

/// Create a Redis connection pool and verify it with a PING.
pub async fn create_pool(config: &CacheConfig) -> CacheResult<Pool> {
    info!("Creating Redis connection pool...");

    let cfg = Config::from_url(&config.url);
    let timeout = Some(config.connect_timeout());

    let pool = cfg
        .builder()
        .map_err(|e| CacheError::configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .wait_timeout(timeout)
        .create_timeout(timeout)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| CacheError::configuration(format!("Failed to create pool: {}", e)))?;

    let mut conn = pool.get().await.map_err(map_pool_error)?;
    redis::cmd("PING")
        .query_async::<String>(&mut *conn)
        .await
        .map_err(map_redis_error)?;

    info!(pool_size = config.pool_size, "Redis connection pool created successfully");

    Ok(pool)
}

/// Redis store over a pooled connection set.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Builds a pool from `config` and wraps it.
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        Ok(Self::new(create_pool(config).await?))
    }

    async fn get_conn(&self) -> CacheResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(map_pool_error)
    }

    /// Collects every key matching a glob pattern with cursor-based SCAN.
    async fn scan(&self, pattern: &str) -> CacheResult<BTreeSet<String>> {
        let mut conn = self.get_conn().await?;
        let mut found = BTreeSet::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut *conn)
                .await
                .map_err(map_redis_error)?;

            found.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(found)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.get_conn().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;

        match &value {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }

        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        expire: Option<Duration>,
        options: SetOptions,
    ) -> CacheResult<bool> {
        options.validate(expire)?;

        let mut command = redis::cmd("SET");
        command.arg(key).arg(value);

        if let Some(ttl) = expire {
            command.arg("PX").arg(ttl_millis(ttl));
        }
        if options.keep_ttl {
            command.arg("KEEPTTL");
        }
        if options.only_if_absent {
            command.arg("NX");
        } else if options.only_if_exists {
            command.arg("XX");
        }

        let mut conn = self.get_conn().await?;
        // Nil when an NX/XX condition blocked the write.
        let reply: Option<String> = command
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;

        let written = reply.is_some();
        debug!("Set key '{}' (expire: {:?}, written: {})", key, expire, written);
        Ok(written)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.get_conn().await?;
        let count: u64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;

        Ok(count > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        validate_expire(ttl)?;

        let mut conn = self.get_conn().await?;
        let updated: bool = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;

        Ok(updated)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.get_conn().await?;
        let deleted: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(deleted > 0)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let pattern = format!("{}*", escape_glob(prefix));
        let keys: Vec<String> = self.scan(&pattern).await?.into_iter().collect();

        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn().await?;
        let mut deleted: u64 = 0;
        for batch in keys.chunks(DELETE_BATCH) {
            let count: u64 = redis::cmd("DEL")
                .arg(batch)
                .query_async(&mut *conn)
                .await
                .map_err(map_redis_error)?;
            deleted += count;
        }

        debug!("Deleted {} keys with prefix '{}'", deleted, prefix);
        Ok(deleted)
    }

    async fn keys(&self, fragment: &str) -> CacheResult<Vec<String>> {
        let pattern = format!("*{}*", escape_glob(fragment));
        Ok(self.scan(&pattern).await?.into_iter().collect())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
        info!("Redis connection pool closed");
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Whole milliseconds for PX/PEXPIRE, at least one. Callers validate the
/// range first.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Escapes glob metacharacters so a literal string can sit inside a MATCH pattern.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_redis_error(err: RedisError) -> CacheError {
    if err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_io_error()
        || err.is_timeout()
        || matches!(err.kind(), ErrorKind::IoError | ErrorKind::AuthenticationFailed)
    {
        CacheError::connection(err.to_string())
    } else {
        CacheError::backend(err.to_string())
    }
}

fn map_pool_error(err: PoolError) -> CacheError {
    match err {
        PoolError::Backend(e) => map_redis_error(e),
        other => CacheError::connection(format!("Failed to get Redis connection: {}", other)),
    }
}
