//! Rate limiter entry point.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::store::{MemoryStore, RateLimitStore};
use super::RateLimitResult;

/// A fixed-window rate limiter keyed by arbitrary identifiers.
///
/// Cloning is cheap and every clone shares the same counters.
///
/// # Example
/// ```ignore
/// use std::time::Duration;
/// use indecisive_edge_lib::security::rate_limit::RateLimiter;
///
/// let limiter = RateLimiter::new();
/// let result = limiter.check("192.168.1.1", 5, Duration::from_secs(60));
/// assert!(result.is_allowed());
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Limiter backed by process memory.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Limiter backed by a custom store.
    pub fn with_store(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// Record a request for `identifier` and report whether it is admitted.
    ///
    /// At most `limit` requests are admitted per window of length `window`.
    /// A zero `limit` rejects everything.
    pub fn check(&self, identifier: &str, limit: u32, window: Duration) -> RateLimitResult {
        self.check_at(identifier, limit, window, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(
        &self,
        identifier: &str,
        limit: u32,
        window: Duration,
        now: Instant,
    ) -> RateLimitResult {
        self.store.check(identifier, limit, window, now)
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        self.store.sweep(now)
    }

    /// Number of identifiers currently tracked
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("entries", &self.store.len())
            .finish()
    }
}
