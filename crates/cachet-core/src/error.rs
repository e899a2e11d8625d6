//! Unified error type for cache operations.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for all Cachet layers.
///
/// A miss is never an error: reads return `Ok(None)` instead. Everything in
/// here is something the caller has to see, including backend outages.
#[derive(Error, Debug)]
pub enum CacheError {
    // ============ Backend Errors ============
    /// Backend unreachable, refused the connection or rejected credentials.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// Backend accepted the connection but failed the command.
    #[error("Cache backend error: {0}")]
    Backend(String),

    // ============ Data Errors ============
    /// Value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A custom key builder refused to produce a key.
    #[error("Key builder error: {0}")]
    KeyBuilder(String),

    // ============ Lifecycle Errors ============
    /// Operation attempted before `init`.
    #[error("Cache is not initialized; call init() first")]
    NotInitialized,

    /// `init` called on a facade that already holds a store.
    #[error("Cache is already initialized")]
    AlreadyInitialized,

    /// Operation attempted after `close`.
    #[error("Cache has been closed")]
    Closed,

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CacheError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Connection(_) | Self::NotInitialized | Self::Closed => 503,
            Self::Backend(_) => 502,
            Self::KeyBuilder(_) => 400,
            Self::Serialization(_)
            | Self::AlreadyInitialized
            | Self::Configuration(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CACHE_CONNECTION_ERROR",
            Self::Backend(_) => "CACHE_BACKEND_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::KeyBuilder(_) => "KEY_BUILDER_ERROR",
            Self::NotInitialized => "CACHE_NOT_INITIALIZED",
            Self::AlreadyInitialized => "CACHE_ALREADY_INITIALIZED",
            Self::Closed => "CACHE_CLOSED",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection<T: Into<String>>(message: T) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend<T: Into<String>>(message: T) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a key builder error.
    #[must_use]
    pub fn key_builder<T: Into<String>>(message: T) -> Self {
        Self::KeyBuilder(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable by the caller.
    ///
    /// The cache never retries on its own.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Backend(_))
    }

    /// Checks if this error comes from calling the facade outside its lifecycle.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized | Self::AlreadyInitialized | Self::Closed
        )
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}

/// Serializable error response for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Request trace ID for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorResponse {
    /// Creates a new error response from a `CacheError`.
    #[must_use]
    pub fn from_error(error: &CacheError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            trace_id: None,
        }
    }

    /// Sets the trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<&CacheError> for ErrorResponse {
    fn from(error: &CacheError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(CacheError::connection("refused").status_code(), 503);
        assert_eq!(CacheError::backend("WRONGTYPE").status_code(), 502);
        assert_eq!(CacheError::key_builder("no id").status_code(), 400);
        assert_eq!(CacheError::NotInitialized.status_code(), 503);
        assert_eq!(CacheError::Closed.status_code(), 503);
        assert_eq!(CacheError::internal("oops").status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CacheError::connection("x").error_code(), "CACHE_CONNECTION_ERROR");
        assert_eq!(CacheError::NotInitialized.error_code(), "CACHE_NOT_INITIALIZED");
        assert_eq!(CacheError::AlreadyInitialized.error_code(), "CACHE_ALREADY_INITIALIZED");
        assert_eq!(CacheError::Closed.error_code(), "CACHE_CLOSED");
        assert_eq!(CacheError::configuration("bad").error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_retriable_errors() {
        assert!(CacheError::connection("reset by peer").is_retriable());
        assert!(CacheError::backend("LOADING").is_retriable());
        assert!(!CacheError::NotInitialized.is_retriable());
        assert!(!CacheError::key_builder("missing").is_retriable());
    }

    #[test]
    fn test_misuse_errors() {
        assert!(CacheError::NotInitialized.is_misuse());
        assert!(CacheError::AlreadyInitialized.is_misuse());
        assert!(CacheError::Closed.is_misuse());
        assert!(!CacheError::connection("down").is_misuse());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let cache_err = CacheError::from(err);
        assert!(matches!(cache_err, CacheError::Serialization(_)));
        assert!(cache_err.to_string().contains("JSON"));
    }

    #[test]
    fn test_error_response_from_error() {
        let err = CacheError::connection("redis://localhost:6379 refused");
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.code, "CACHE_CONNECTION_ERROR");
        assert!(response.message.contains("refused"));
        assert!(response.trace_id.is_none());
    }

    #[test]
    fn test_error_response_with_trace_id() {
        let response = ErrorResponse::from(&CacheError::Closed).with_trace_id("trace-123");
        assert_eq!(response.trace_id, Some("trace-123".to_string()));
    }
}
