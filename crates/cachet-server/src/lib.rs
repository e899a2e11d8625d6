//! # Cachet Server Library
//!
//! Application assembly and startup utilities for the demo server.

pub mod app;
pub mod startup;

pub use app::{App, AppBuilder};
