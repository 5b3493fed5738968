use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Cache configuration.
///
/// The cache is used for:
/// - Rate limiting counters
/// - Mirroring the benchmark catalog with a TTL
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum CacheConfig {
    /// No caching. Rate limiting is disabled and the benchmark catalog is
    /// always served from the compiled-in data. Suitable for local dev.
    #[default]
    None,

    /// In-memory cache. Good for single-node deployments.
    /// Data is lost on restart. Not suitable for multi-node.
    Memory(MemoryCacheConfig),

    /// Redis cache. Required for multi-node deployments.
    Redis(RedisCacheConfig),
}

impl CacheConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, CacheConfig::None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            CacheConfig::None => Ok(()),
            CacheConfig::Memory(c) => c.validate(),
            CacheConfig::Redis(c) => c.validate(),
        }
    }

    /// Get TTL configuration, using defaults if cache is not configured.
    pub fn ttl(&self) -> CacheTtlConfig {
        match self {
            CacheConfig::None => CacheTtlConfig::default(),
            CacheConfig::Memory(c) => c.ttl.clone(),
            CacheConfig::Redis(c) => c.ttl.clone(),
        }
    }
}

/// In-memory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Number of entries to evict when cache is full.
    /// Eviction removes expired entries first, then uses LRU.
    #[serde(default = "default_eviction_batch_size")]
    pub eviction_batch_size: usize,

    /// TTL settings for specific cache types.
    #[serde(default)]
    pub ttl: CacheTtlConfig,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            eviction_batch_size: default_eviction_batch_size(),
            ttl: CacheTtlConfig::default(),
        }
    }
}

impl MemoryCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::Validation(
                "Memory cache max_entries must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_entries() -> usize {
    10_000
}

fn default_eviction_batch_size() -> usize {
    100
}

/// Redis cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisCacheConfig {
    /// Redis connection URL.
    /// Format: redis://[user:password@]host:port[/database]
    pub url: String,

    /// Connection timeout in seconds.
    #[serde(default = "default_redis_timeout")]
    pub connect_timeout_secs: u64,

    /// Key prefix for all cache keys.
    /// Useful when sharing a Redis instance with other applications.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// TTL settings for specific cache types.
    #[serde(default)]
    pub ttl: CacheTtlConfig,
}

impl RedisCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Validation("Redis URL cannot be empty".into()));
        }
        Ok(())
    }
}

fn default_redis_timeout() -> u64 {
    5
}

fn default_key_prefix() -> String {
    "garlic:".to_string()
}

/// TTL configuration for different cache types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheTtlConfig {
    /// TTL for rate limit counters in seconds. This is the rate limit window.
    #[serde(default = "default_rate_limit_ttl")]
    pub rate_limit_secs: u64,

    /// TTL for the mirrored benchmark catalog in seconds.
    #[serde(default = "default_benchmarks_ttl")]
    pub benchmarks_secs: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            rate_limit_secs: default_rate_limit_ttl(),
            benchmarks_secs: default_benchmarks_ttl(),
        }
    }
}

fn default_rate_limit_ttl() -> u64 {
    60 // 1 minute
}

fn default_benchmarks_ttl() -> u64 {
    1800 // 30 minutes
}
