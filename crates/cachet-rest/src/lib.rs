//! # Cachet REST
//!
//! REST API layer using Axum. Serves a small item catalog whose lookups go
//! through a [`cachet::Cached`] wrapper, plus cache inspection and
//! invalidation endpoints.

pub mod catalog;
pub mod controllers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use catalog::*;
pub use router::*;
pub use state::*;
