//! Memoization for password strength analysis.
//!
//! Analysis is pure CPU work, but interactive callers tend to re-submit the
//! same candidate (strength meter on every keystroke, retries). The cache
//! keys entries by a truncated one-way hash of the input, so the password
//! itself is never stored. Entries expire after a TTL and are pruned lazily;
//! a capacity bound keeps memory flat.

use crate::password::strength::{analyze_password, StrengthReport};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default time-to-live for cached reports: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default maximum number of cached reports.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Hex characters kept from the BLAKE3 digest (64 bits of key space).
const KEY_PREFIX_LEN: usize = 16;

struct CacheEntry {
    report: StrengthReport,
    inserted_at: Instant,
}

/// Bounded TTL cache of [`StrengthReport`]s.
///
/// Thread-safe; a poisoned lock is recovered rather than propagated since
/// cached reports cannot be left in a partially-written state.
pub struct AnalysisCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl AnalysisCache {
    /// Cache with the default TTL (1 hour) and capacity (1024 entries).
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    /// Cache with explicit TTL and capacity.
    #[must_use]
    pub fn with_settings(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached report for `password`, analyzing and caching on
    /// miss or expiry.
    #[must_use]
    pub fn get_or_analyze(&self, password: &str) -> StrengthReport {
        let key = cache_key(password);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get(&key) {
            if entry.inserted_at.elapsed() <= self.ttl {
                return entry.report.clone();
            }
            entries.remove(&key);
        }

        let report = analyze_password(password);
        if entries.len() >= self.capacity {
            Self::evict(&mut entries, self.ttl, self.capacity);
        }
        entries.insert(
            key,
            CacheEntry {
                report: report.clone(),
                inserted_at: Instant::now(),
            },
        );
        report
    }

    /// Number of live entries (expired-but-unpruned entries included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all cached reports.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make room: drop expired entries, then the oldest entry if the map is
    /// still at capacity.
    fn evict(entries: &mut HashMap<String, CacheEntry>, ttl: Duration, capacity: usize) {
        entries.retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
        if entries.len() >= capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .field("entries", &self.len())
            .finish()
    }
}

/// Truncated BLAKE3 hex digest of the password. One-way, so the cache key
/// cannot be reversed into the input.
fn cache_key(password: &str) -> String {
    let digest = blake3::hash(password.as_bytes());
    digest.to_hex().as_str()[..KEY_PREFIX_LEN].to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
