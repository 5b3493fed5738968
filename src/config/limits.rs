use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Rate limit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// IP-based rate limiting for all API requests.
    #[serde(default)]
    pub ip_rate_limits: IpRateLimitConfig,
}

impl LimitsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ip_rate_limits.enabled && self.ip_rate_limits.requests_per_minute == 0 {
            return Err(ConfigError::Validation(
                "ip_rate_limits.requests_per_minute must be greater than 0 when enabled".into(),
            ));
        }
        Ok(())
    }
}

/// IP-based rate limiting configuration.
///
/// Limiting only takes effect when a cache is configured; without one the
/// limiter fails open and every request is allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpRateLimitConfig {
    /// Enable IP-based rate limiting.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per rate-limit window for each client IP.
    /// The window length is the cache's `ttl.rate_limit_secs` (default 60s).
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,
}

impl Default for IpRateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            requests_per_minute: default_rpm(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_rpm() -> u32 {
    100
}
