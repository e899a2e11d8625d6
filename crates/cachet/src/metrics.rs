//! Prometheus metrics for cache effectiveness.
//!
//! Every counter carries a `prefix` label so hit ratios can be read per
//! cached handler group.

use metrics::{counter, describe_counter};

/// Metric names for the cache layer.
pub mod names {
    /// Decorated calls answered from the cache.
    pub const CACHE_HITS_TOTAL: &str = "cachet_cache_hits_total";
    /// Decorated calls that had to compute.
    pub const CACHE_MISSES_TOTAL: &str = "cachet_cache_misses_total";
    /// Results written to the cache.
    pub const CACHE_SETS_TOTAL: &str = "cachet_cache_sets_total";
    /// Results not stored because they were empty and `none` was false.
    pub const CACHE_SKIPPED_TOTAL: &str = "cachet_cache_skipped_total";
    /// Backend failures seen by decorated calls.
    pub const CACHE_ERRORS_TOTAL: &str = "cachet_cache_errors_total";
}

/// Label value used when a decorated handler has no prefix.
pub const NO_PREFIX: &str = "none";

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::CACHE_HITS_TOTAL,
        "Total number of decorated calls served from the cache"
    );
    describe_counter!(
        names::CACHE_MISSES_TOTAL,
        "Total number of decorated calls that missed the cache"
    );
    describe_counter!(
        names::CACHE_SETS_TOTAL,
        "Total number of results written to the cache"
    );
    describe_counter!(
        names::CACHE_SKIPPED_TOTAL,
        "Total number of empty results not written to the cache"
    );
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of cache backend errors during decorated calls"
    );
}

/// Record a cache hit.
pub fn record_hit(prefix: &str) {
    counter!(names::CACHE_HITS_TOTAL, "prefix" => prefix.to_string()).increment(1);
}

/// Record a cache miss.
pub fn record_miss(prefix: &str) {
    counter!(names::CACHE_MISSES_TOTAL, "prefix" => prefix.to_string()).increment(1);
}

/// Record a stored result.
pub fn record_set(prefix: &str) {
    counter!(names::CACHE_SETS_TOTAL, "prefix" => prefix.to_string()).increment(1);
}

/// Record an empty result that was not stored.
pub fn record_skipped(prefix: &str) {
    counter!(names::CACHE_SKIPPED_TOTAL, "prefix" => prefix.to_string()).increment(1);
}

/// Record a backend error.
pub fn record_error(prefix: &str, operation: &'static str) {
    counter!(
        names::CACHE_ERRORS_TOTAL,
        "prefix" => prefix.to_string(),
        "operation" => operation
    )
    .increment(1);
}
