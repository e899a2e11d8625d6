//! # Cachet
//!
//! Response caching for async request handlers.
//!
//! - [`CacheFacade`]: a process-wide handle that derives namespaced keys and
//!   delegates to a pluggable [`Store`] (Redis or in-memory).
//! - [`cached`]: wraps a handler so repeated calls with the same arguments
//!   are answered from the cache until the entry expires.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   args    ┌────────────┐  KeyArgs   ┌─────────────┐
//! │   Handler    │ ────────▶ │ Cached<F>  │ ─────────▶ │ CacheFacade │
//! └──────────────┘           └─────┬──────┘            └──────┬──────┘
//!        ▲   miss: run f(args)     │                          │ final key
//!        └─────────────────────────┘                   ┌──────▼──────┐
//!                                                       │ dyn Store   │
//!                                                       │ Redis | Mem │
//!                                                       └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use cachet::{cached, CacheFacade, CacheOptions};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> cachet::CacheResult<()> {
//! let cache = Arc::new(CacheFacade::new("shop"));
//! cache.init("redis://localhost:6379").await?;
//! let guard = cache.guard();
//!
//! let price = cached(
//!     Arc::clone(&cache),
//!     CacheOptions::default()
//!         .key("price")
//!         .prefix("prices")
//!         .expire(Duration::from_secs(30)),
//!     |sku: String| async move { sku.len() as u64 * 100 },
//! );
//! let cents: u64 = price.call("ABC-1".to_string()).await?;
//!
//! guard.close().await;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod decorator;
pub mod facade;
pub mod metrics;

pub use codec::{Codec, JsonCodec};
pub use decorator::{cached, CacheOptions, Cached, DEFAULT_EXPIRE};
pub use facade::{CacheFacade, CacheGuard};

pub use cachet_core::{
    build_key, key_builder_fn, CacheError, CacheResult, DefaultKeyBuilder, KeyArgs, KeyBuilder,
    KeyParams, KeyParts,
};
pub use cachet_store::{MemoryStore, RedisStore, SetOptions, Store};
