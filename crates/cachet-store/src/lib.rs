//! # Cachet Store
//!
//! The [`Store`] capability every cache backend implements, plus two
//! adapters: [`RedisStore`] over a `deadpool-redis` pool and
//! [`MemoryStore`], an in-process map with per-entry expiry.
//!
//! All operations take the final key string; key derivation happens a layer
//! up, in the facade.

mod connect;
mod memory;
mod redis;
mod store;

pub use connect::connect;
pub use memory::MemoryStore;
pub use redis::{create_pool, RedisStore};
pub use store::{validate_expire, SetOptions, Store, MAX_EXPIRE};
