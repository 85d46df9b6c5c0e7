use std::net::SocketAddr;
use std::time::Duration;

use super::{RateLimitResult, RateLimiter};
use crate::config::RateLimitConfig;

/// Quota applied to every path under `prefix`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    pub prefix: String,
    pub limit: u32,
    pub window: Duration,
}

/// Maps request paths to quotas and checks them against one shared limiter.
///
/// Counters are keyed by route prefix and client identifier, so a client's
/// usage on one route never counts against another.
#[derive(Debug, Clone)]
pub struct RateLimitManager {
    limiter: RateLimiter,
    rules: Vec<RateLimitRule>,
    enabled: bool,
}

impl RateLimitManager {
    /// Create a new rate limit manager from configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limiter(config, RateLimiter::new())
    }

    /// Same as [`new`](Self::new) but checks against an existing limiter.
    pub fn with_limiter(config: &RateLimitConfig, limiter: RateLimiter) -> Self {
        let rules = config
            .routes
            .iter()
            .map(|route| RateLimitRule {
                prefix: route.prefix.clone(),
                limit: route.limit,
                window: Duration::from_millis(route.window_ms),
            })
            .collect();

        Self { limiter, rules, enabled: config.enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.rules.is_empty()
    }

    pub fn rules(&self) -> &[RateLimitRule] {
        &self.rules
    }

    /// First rule whose prefix matches `path`. `None` when disabled.
    pub fn rule_for(&self, path: &str) -> Option<&RateLimitRule> {
        if !self.enabled {
            return None;
        }
        self.rules.iter().find(|rule| path.starts_with(rule.prefix.as_str()))
    }

    /// Check a request from `identifier` against `rule`.
    pub fn check(&self, identifier: &str, rule: &RateLimitRule) -> RateLimitResult {
        let key = format!("{}|{}", rule.prefix, identifier);
        self.limiter.check(&key, rule.limit, rule.window)
    }

    /// The shared limiter, e.g. for the sweeper
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// Identify the client behind a request.
///
/// Uses the first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer
/// address of the connection.
pub fn extract_client_identifier(peer: SocketAddr, headers: &http::HeaderMap) -> String {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|xff| xff.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first_ip.to_string();
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return real_ip.to_string();
    }

    peer.ip().to_string()
}
