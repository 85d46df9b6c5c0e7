use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use hyper::Response;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::proxy::synthetic_response::{json_body, RespBody};
use crate::security::{extract_client_identifier, RateLimitManager, RateLimitResult};
use crate::telemetry::Metrics;

pub const RETRY_AFTER: HeaderName = HeaderName::from_static("retry-after");
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Outcome of the rate-limit stage of the pipeline
pub enum RateLimitCheck {
    /// Path is not rate limited
    Unlimited,
    /// Admitted; the result is echoed in the response headers
    Allowed(RateLimitResult),
    /// Rejected with a ready-made 429
    Limited(Response<RespBody>),
}

/// Check rate limiting for an incoming request.
pub fn check_rate_limit(
    manager: &RateLimitManager,
    path: &str,
    peer: SocketAddr,
    headers: &HeaderMap,
    metrics: Option<&Arc<Metrics>>,
) -> RateLimitCheck {
    let Some(rule) = manager.rule_for(path) else {
        return RateLimitCheck::Unlimited;
    };

    let identifier = extract_client_identifier(peer, headers);
    if let Some(m) = metrics {
        m.record_rate_limit_request(&rule.prefix);
    }

    let result = manager.check(&identifier, rule);
    match result {
        RateLimitResult::Limited { .. } => {
            debug!(%identifier, route = %rule.prefix, "Rate limit exceeded");
            if let Some(m) = metrics {
                m.record_rate_limit_rejection(&rule.prefix);
            }
            RateLimitCheck::Limited(create_429_response(&result, SystemTime::now()))
        }
        RateLimitResult::Allowed { limit, remaining, .. } => {
            debug!(limit, remaining, route = %rule.prefix, "Rate limit check passed");
            if let Some(m) = metrics {
                m.record_rate_limit_allowed(&rule.prefix);
            }
            RateLimitCheck::Allowed(result)
        }
    }
}

/// Seconds until reset, rounded up and never below one.
pub fn retry_after_secs(reset_after: Duration) -> u64 {
    let secs = reset_after.as_secs();
    let secs = if reset_after.subsec_nanos() > 0 { secs.saturating_add(1) } else { secs };
    secs.max(1)
}

/// Unix timestamp (seconds) at which the window resets.
pub fn reset_epoch_secs(reset_after: Duration, now: SystemTime) -> u64 {
    let reset_at = now.checked_add(reset_after).unwrap_or(now);
    let since_epoch = reset_at.duration_since(UNIX_EPOCH).unwrap_or_default();
    since_epoch
        .as_secs()
        .saturating_add(u64::from(since_epoch.subsec_nanos() > 0))
}

/// Write the `X-RateLimit-*` headers describing `result`.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult, now: SystemTime) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(result.limit()));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(result.remaining()));
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from(reset_epoch_secs(result.reset_after(), now)),
    );
}

pub fn create_429_response(result: &RateLimitResult, now: SystemTime) -> Response<RespBody> {
    let body = json!({"error": "Too many requests. Please try again later."}).to_string();
    let mut resp = Response::new(json_body(body));
    *resp.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    let headers = resp.headers_mut();
    headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(result.reset_after())));
    apply_rate_limit_headers(headers, result, now);

    resp
}
