pub mod rate_limit;

pub use rate_limit::{extract_client_identifier, RateLimitManager, RateLimitResult, RateLimiter};
