use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};

use super::{
    error::CacheResult,
    traits::{Cache, RateLimitResult},
};
use crate::config::RedisCacheConfig;

/// Lua script for atomic rate limit check and increment.
/// Returns [allowed (0/1), current_count, ttl_remaining]
///
/// NOTE: Only sets TTL when the key has no expiry (TTL < 0).
/// This ensures fixed time windows are maintained and counters
/// expire correctly at the end of each window.
const RATE_LIMIT_SCRIPT: &str = r#"
local key = KEYS[1]
local limit = tonumber(ARGV[1])
local window_secs = tonumber(ARGV[2])

local current = tonumber(redis.call('GET', key) or '0')
local ttl = redis.call('TTL', key)

if current >= limit then
    if ttl < 0 then
        ttl = window_secs
    end
    return {0, current, ttl}
end

local new_value = redis.call('INCR', key)
if redis.call('TTL', key) < 0 then
    redis.call('EXPIRE', key, window_secs)
    ttl = window_secs
end
return {1, new_value, ttl}
"#;

/// Redis cache implementation.
///
/// Uses a single multiplexed connection; the `redis` crate pipelines
/// concurrent commands over it. Rate limit counters use a Lua script so the
/// check-and-increment is atomic across nodes.
pub struct RedisCache {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisCache {
    pub async fn from_config(config: &RedisCacheConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.url.as_str())?;

        let conn = tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            super::error::CacheError::Internal(format!(
                "Timed out connecting to Redis after {}s",
                config.connect_timeout_secs
            ))
        })??;

        tracing::info!(key_prefix = %config.key_prefix, "Redis cache connected");

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.prefixed_key(key)).await?;
        Ok(value)
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let full_key = self.prefixed_key(key);

        if ttl.is_zero() {
            let _: () = conn.set(full_key, value).await?;
        } else {
            let _: () = conn.set_ex(full_key, value, ttl.as_secs()).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.prefixed_key(key)).await?;
        Ok(())
    }

    async fn check_and_incr_rate_limit(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
    ) -> CacheResult<RateLimitResult> {
        let mut conn = self.conn.clone();
        let full_key = self.prefixed_key(key);

        let result: Vec<i64> = redis::Script::new(RATE_LIMIT_SCRIPT)
            .key(&full_key)
            .arg(limit)
            .arg(window_secs as i64)
            .invoke_async(&mut conn)
            .await?;

        Ok(RateLimitResult {
            allowed: result.first().copied().unwrap_or(0) == 1,
            current: result.get(1).copied().unwrap_or(0),
            limit,
            reset_secs: result.get(2).copied().unwrap_or(window_secs as i64) as u64,
        })
    }
}
