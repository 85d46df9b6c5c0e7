//! Fixed-window rate limiting for the storefront API.
//!
//! Each identifier (normally the client IP) gets a counter and a window
//! expiry. The first request opens a window of the configured length, later
//! requests increment the counter until it reaches the limit, and anything
//! past that is rejected until the window expires. Rejections never extend
//! the window.
//!
//! # Architecture
//!
//! 1. **Store** (`store.rs`): the counter table behind the [`RateLimitStore`]
//!    trait. [`MemoryStore`] keeps it in process memory.
//!
//! 2. **RateLimiter** (`limiter.rs`): the `check(identifier, limit, window)`
//!    entry point plus on-demand sweeping.
//!
//! 3. **Sweeper** (`sweep.rs`): background task that drops expired entries on
//!    a fixed interval so memory stays bounded by active identifiers.
//!
//! 4. **RateLimitManager** (`manager.rs`): maps request paths to configured
//!    quotas and extracts client identifiers.
//!
//! # Example Usage
//!
//! ```ignore
//! use indecisive_edge_lib::security::rate_limit::{RateLimiter, RateLimitResult};
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new();
//!
//! match limiter.check("192.168.1.1", 5, Duration::from_secs(60)) {
//!     RateLimitResult::Allowed { remaining, .. } => {
//!         println!("Request allowed, {remaining} remaining");
//!     }
//!     RateLimitResult::Limited { reset_after, .. } => {
//!         println!("Rate limited. Try again in {reset_after:?}");
//!     }
//! }
//! ```

mod limiter;
mod manager;
mod store;
mod sweep;

pub use limiter::RateLimiter;
pub use manager::{extract_client_identifier, RateLimitManager, RateLimitRule};
pub use store::{MemoryStore, RateLimitEntry, RateLimitStore};
pub use sweep::spawn_sweeper;

use std::time::Duration;

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed to proceed.
    Allowed {
        /// Maximum number of requests allowed in the window
        limit: u32,
        /// Requests left in the current window after this one
        remaining: u32,
        /// Time until the current window expires
        reset_after: Duration,
    },
    /// Request is rate limited and should be rejected.
    Limited {
        /// Maximum number of requests allowed in the window
        limit: u32,
        /// Number of requests remaining (always 0)
        remaining: u32,
        /// Time until the current window expires
        reset_after: Duration,
    },
}

impl RateLimitResult {
    /// Returns true if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Returns true if the request is limited.
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitResult::Limited { .. })
    }

    pub fn limit(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { limit, .. } | RateLimitResult::Limited { limit, .. } => {
                *limit
            }
        }
    }

    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { remaining, .. }
            | RateLimitResult::Limited { remaining, .. } => *remaining,
        }
    }

    /// Time until the window resets, for both outcomes.
    pub fn reset_after(&self) -> Duration {
        match self {
            RateLimitResult::Allowed { reset_after, .. }
            | RateLimitResult::Limited { reset_after, .. } => *reset_after,
        }
    }
}
