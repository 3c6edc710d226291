//! Version lookup caching with TTL support

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Cached lookup result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Resolved version
    pub value: String,
    /// When the entry was stored
    pub timestamp: Instant,
}

impl CacheEntry {
    /// Entries live while `now - timestamp <= ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.timestamp.elapsed() <= ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of stored entries, fresh or not
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing live
    pub misses: u64,
}

/// In-process version cache keyed by `{backend}:{name}`.
///
/// One instance is shared by every resolver of an engine; nothing is
/// persisted across runs.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create an empty cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live entry. Expired entries are evicted and count as misses.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache entry for {} expired", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `value` under `key`, restarting its TTL
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(
            key.into(),
            CacheEntry {
                value: value.into(),
                timestamp: Instant::now(),
            },
        );
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(codep_config::DEFAULT_CACHE_TTL_SECS))
    }
}
