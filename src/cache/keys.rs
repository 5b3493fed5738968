//! Centralized cache key construction.
//!
//! All cache keys are built here so the key schema is visible in one place.

pub struct CacheKeys;

impl CacheKeys {
    /// Rate limit counter for a client identifier (IP or `"unknown"`).
    pub fn rate_limit(client_id: &str) -> String {
        format!("rate:{}", client_id)
    }

    /// The mirrored benchmark catalog.
    pub fn benchmarks() -> &'static str {
        "benchmarks"
    }
}
