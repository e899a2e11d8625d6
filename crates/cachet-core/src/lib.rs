//! # Cachet Core
//!
//! Core types, error definitions and cache key derivation for Cachet.
//! Every other crate in the workspace builds on the [`CacheError`] type and
//! the key builder defined here.

pub mod error;
pub mod key;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use key::*;
pub use result::*;
