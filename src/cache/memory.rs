use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    error::CacheResult,
    traits::{Cache, RateLimitResult},
};
use crate::config::MemoryCacheConfig;

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(data: Vec<u8>, expires_at: Option<Instant>) -> Self {
        Self {
            data,
            expires_at,
            last_accessed: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// A rate-limit counter bound to a fixed window.
///
/// The window starts when the counter is created and is never extended by
/// later increments, so counters reset at window boundaries just like
/// store-side key expiry would.
struct CounterEntry {
    count: i64,
    window_ends_at: Instant,
}

impl CounterEntry {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            window_ends_at: Instant::now() + window,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.window_ends_at
    }

    fn remaining_secs(&self) -> u64 {
        self.window_ends_at
            .saturating_duration_since(Instant::now())
            .as_secs()
    }
}

/// In-memory cache implementation using DashMap for concurrent access.
///
/// # Multi-Node Deployments
///
/// **WARNING**: This cache is NOT suitable for multi-node deployments.
/// Each node maintains its own independent counters and catalog mirror,
/// so rate limiting is per-node, not global. Use the Redis cache for
/// multi-node deployments.
pub struct MemoryCache {
    data: DashMap<String, CacheEntry>,
    counters: DashMap<String, CounterEntry>,
    max_entries: usize,
    eviction_batch_size: usize,
}

impl MemoryCache {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            data: DashMap::new(),
            counters: DashMap::new(),
            max_entries: config.max_entries,
            eviction_batch_size: config.eviction_batch_size.max(1),
        }
    }

    fn evict_if_needed(&self) {
        if self.data.len() < self.max_entries {
            return;
        }

        // First pass: remove all expired entries
        self.data.retain(|_, entry| !entry.is_expired());

        // If still at or above capacity, evict least recently used entries
        let current_len = self.data.len();
        if current_len < self.max_entries {
            return;
        }

        let target_size = self.max_entries.saturating_sub(self.eviction_batch_size);
        let to_evict = current_len.saturating_sub(target_size);

        if to_evict == 0 {
            return;
        }

        let mut entries: Vec<_> = self
            .data
            .iter()
            .map(|entry| (entry.key().clone(), entry.last_accessed))
            .collect();
        entries.sort_by_key(|(_, last_accessed)| *last_accessed);

        for (key, _) in entries.into_iter().take(to_evict) {
            self.data.remove(&key);
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if let Some(mut entry) = self.data.get_mut(key) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove(key);
                return Ok(None);
            }

            // Update last accessed time for LRU tracking
            entry.touch();
            Ok(Some(entry.data.clone()))
        } else {
            Ok(None)
        }
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.evict_if_needed();

        let expires_at = if !ttl.is_zero() {
            Some(Instant::now() + ttl)
        } else {
            None
        };

        self.data
            .insert(key.to_string(), CacheEntry::new(value.to_vec(), expires_at));

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.remove(key);
        self.counters.remove(key);
        Ok(())
    }

    async fn check_and_incr_rate_limit(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
    ) -> CacheResult<RateLimitResult> {
        let window = Duration::from_secs(window_secs);

        // The entry guard holds the shard write lock, making the
        // check-and-increment atomic per key.
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| CounterEntry::new(window));

        if entry.is_expired() {
            *entry = CounterEntry::new(window);
        }

        if entry.count >= limit as i64 {
            return Ok(RateLimitResult {
                allowed: false,
                current: entry.count,
                limit,
                reset_secs: entry.remaining_secs(),
            });
        }

        entry.count += 1;
        Ok(RateLimitResult {
            allowed: true,
            current: entry.count,
            limit,
            reset_secs: entry.remaining_secs(),
        })
    }
}
