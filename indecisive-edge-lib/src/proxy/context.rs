use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, UpstreamConfig};
use crate::error::Result;
use crate::locale::{LocaleMiddleware, LocaleSettings};
use crate::proxy::forwarding::{create_client, HttpClient};
use crate::security::RateLimitManager;
use crate::telemetry::Metrics;

/// Everything a request handler needs, shared by all connections
#[derive(Clone)]
pub struct EdgeContext {
    pub upstream: Arc<UpstreamConfig>,
    pub upstream_timeout: Duration,
    pub client: HttpClient,
    pub locale: LocaleMiddleware,
    pub rate_limits: Arc<RateLimitManager>,
    pub metrics: Option<Arc<Metrics>>,
}

impl EdgeContext {
    pub fn from_config(config: &Config, metrics: Option<Arc<Metrics>>) -> Result<Self> {
        let settings = LocaleSettings::from_config(&config.locale, config.production)?;

        Ok(Self {
            upstream: Arc::new(config.upstream.clone()),
            upstream_timeout: Duration::from_millis(config.timeout.upstream_ms),
            client: create_client(&config.upstream),
            locale: LocaleMiddleware::new(settings),
            rate_limits: Arc::new(RateLimitManager::new(&config.rate_limit)),
            metrics,
        })
    }
}
