//! # ResultCache: TTL + size bounded memoization of task results.
//!
//! ## Rules
//! - `get` treats an expired entry as a miss and evicts it on the spot.
//! - `put` first purges every expired entry, then evicts the oldest
//!   (`stored_at`) live entries until the total fits under
//!   `eviction_target × max_bytes`.
//! - An entry that alone exceeds `max_bytes` is never stored.
//! - TTL expiry is independent of size pressure.
//!
//! Sizes are estimates: serialized JSON length of the result plus key length.
//! Time comes from `tokio::time::Instant`, so a paused test clock drives expiry.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::tasks::TaskResult;

/// Cache sizing and expiry.
///
/// ## Field semantics
/// - `max_bytes`: ceiling on the summed size of live entries (`0` = cache disabled)
/// - `default_ttl`: TTL used by [`ResultCache::put_default`]
/// - `eviction_target`: fraction of `max_bytes` eviction shrinks to (clamped to `0.0..=1.0`);
///   `1.0` evicts just enough, `0.8` leaves headroom
#[derive(Clone, Debug, PartialEq)]
pub struct CacheConfig {
    pub max_bytes: usize,
    pub default_ttl: Duration,
    pub eviction_target: f64,
}

impl CacheConfig {
    /// Byte budget eviction shrinks to.
    #[inline]
    pub fn target_bytes(&self) -> usize {
        (self.max_bytes as f64 * self.eviction_target.clamp(0.0, 1.0)).round() as usize
    }

    /// Returns a config leaving 20% headroom after eviction.
    pub fn with_headroom(mut self) -> Self {
        self.eviction_target = 0.8;
        self
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.max_bytes > 0
    }
}

impl Default for CacheConfig {
    /// Default configuration:
    ///
    /// - `max_bytes = 50 MiB`
    /// - `default_ttl = 5 min`
    /// - `eviction_target = 1.0`
    fn default() -> Self {
        Self {
            max_bytes: 50 * 1024 * 1024,
            default_ttl: Duration::from_secs(300),
            eviction_target: 1.0,
        }
    }
}

/// Counters for dashboards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub entries: usize,
    pub bytes: usize,
}

impl CacheStats {
    /// Hits over total lookups (`0.0` before the first lookup).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry {
    result: TaskResult,
    stored_at: Instant,
    ttl: Duration,
    size: usize,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

/// Per-façade result cache.
pub struct ResultCache {
    cfg: CacheConfig,
    entries: HashMap<String, CacheEntry>,
    bytes: usize,
    stats: CacheStats,
}

impl ResultCache {
    pub fn new(cfg: CacheConfig) -> Self {
        Self {
            cfg,
            entries: HashMap::new(),
            bytes: 0,
            stats: CacheStats::default(),
        }
    }

    /// Looks up `key`; an expired entry counts as a miss and is dropped.
    pub fn get(&mut self, key: &str) -> Option<TaskResult> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => {
                self.stats.misses += 1;
                return None;
            }
            Some(entry) => entry.expired(now),
        };
        if expired {
            self.drop_entry(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }
        self.stats.hits += 1;
        self.entries.get(key).map(|e| e.result.clone())
    }

    /// Stores `result` under `key` for `ttl`.
    pub fn put(&mut self, key: impl Into<String>, result: TaskResult, ttl: Duration) {
        if !self.cfg.is_enabled() || ttl.is_zero() {
            return;
        }
        let key = key.into();
        let size = estimate_size(&key, &result);
        if size > self.cfg.max_bytes {
            trace!(key = %key, size, "result too large to cache");
            return;
        }

        self.drop_entry(&key);
        self.purge_expired();
        if self.bytes + size > self.cfg.max_bytes {
            let budget = self.cfg.target_bytes().saturating_sub(size);
            self.evict_oldest_until(budget);
        }

        self.bytes += size;
        self.entries.insert(
            key,
            CacheEntry {
                result,
                stored_at: Instant::now(),
                ttl,
                size,
            },
        );
    }

    /// [`put`](Self::put) with the configured default TTL.
    pub fn put_default(&mut self, key: impl Into<String>, result: TaskResult) {
        let ttl = self.cfg.default_ttl;
        self.put(key, result, ttl);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            bytes: self.bytes,
            ..self.stats
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.cfg
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn drop_entry(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.bytes -= old.size;
        }
    }

    fn purge_expired(&mut self) {
        let now = Instant::now();
        let before = self.entries.len();
        let mut freed = 0;
        self.entries.retain(|_, e| {
            let keep = !e.expired(now);
            if !keep {
                freed += e.size;
            }
            keep
        });
        self.bytes -= freed;
        self.stats.expirations += (before - self.entries.len()) as u64;
    }

    fn evict_oldest_until(&mut self, budget: usize) {
        let mut by_age: Vec<(Instant, String)> = self
            .entries
            .iter()
            .map(|(k, e)| (e.stored_at, k.clone()))
            .collect();
        by_age.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, key) in by_age {
            if self.bytes <= budget {
                break;
            }
            self.drop_entry(&key);
            self.stats.evictions += 1;
        }
    }
}

fn estimate_size(key: &str, result: &TaskResult) -> usize {
    let body = serde_json::to_vec(result).map_or(0, |v| v.len());
    key.len() + body
}
