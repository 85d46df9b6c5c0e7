//! Backing storage for rate-limit counters.

use ahash::AHashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

use super::RateLimitResult;

/// Counter for one identifier within its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests admitted since the window started
    pub count: u32,
    /// When the current window expires
    pub reset_time: Instant,
}

impl RateLimitEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.reset_time <= now
    }
}

/// Storage seam for [`RateLimiter`](super::RateLimiter).
///
/// `check` must behave as one atomic check-and-increment per identifier.
/// A shared store (e.g. a key-value cache with increment-with-TTL) can
/// implement this to make limits hold across instances.
pub trait RateLimitStore: Send + Sync {
    /// Record a request for `identifier` at `now` and report the outcome.
    fn check(&self, identifier: &str, limit: u32, window: Duration, now: Instant)
        -> RateLimitResult;

    /// Drop every entry whose window ended at or before `now`.
    /// Returns the number of entries removed.
    fn sweep(&self, now: Instant) -> usize;

    /// Number of tracked identifiers
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store. Counters vanish on restart and are not shared
/// between instances.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<AHashMap<String, RateLimitEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entry for `identifier`, if any
    pub fn entry(&self, identifier: &str) -> Option<RateLimitEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.get(identifier).copied(),
            Err(_) => None,
        }
    }
}

impl RateLimitStore for MemoryStore {
    fn check(
        &self,
        identifier: &str,
        limit: u32,
        window: Duration,
        now: Instant,
    ) -> RateLimitResult {
        if limit == 0 {
            return RateLimitResult::Limited { limit, remaining: 0, reset_after: window };
        }

        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Rate limit store lock poisoned, allowing request");
                return RateLimitResult::Allowed { limit, remaining: limit, reset_after: window };
            }
        };

        if let Some(entry) = entries.get_mut(identifier) {
            if !entry.is_expired(now) {
                let reset_after = entry.reset_time.saturating_duration_since(now);
                if entry.count >= limit {
                    // Rejected calls do not touch the counter or the window.
                    return RateLimitResult::Limited { limit, remaining: 0, reset_after };
                }
                entry.count = entry.count.saturating_add(1);
                return RateLimitResult::Allowed {
                    limit,
                    remaining: limit.saturating_sub(entry.count),
                    reset_after,
                };
            }
        }

        entries.insert(
            identifier.to_string(),
            RateLimitEntry { count: 1, reset_time: now + window },
        );
        RateLimitResult::Allowed { limit, remaining: limit.saturating_sub(1), reset_after: window }
    }

    fn sweep(&self, now: Instant) -> usize {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Rate limit store lock poisoned, skipping sweep");
                return 0;
            }
        };
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(entries.len())
    }

    fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}
