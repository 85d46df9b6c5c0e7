use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:3000" or "127.0.0.1:8080"
    pub listen: SocketAddr,
    /// Storefront application that admitted requests are forwarded to
    pub upstream: UpstreamConfig,
    /// Production deployments mark the locale cookie `Secure`
    /// Default: false
    #[serde(default)]
    pub production: bool,
    /// Locale routing configuration
    #[serde(default)]
    pub locale: LocaleConfig,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Upstream (storefront) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Upstream address (host:port format)
    /// Example: "storefront:3000" or "127.0.0.1:3000"
    pub address: String,
    /// Preserve the original Host header from clients when forwarding
    /// When false the upstream receives its own address as Host
    /// Default: false
    #[serde(default)]
    pub preserve_host: bool,
    /// How long an idle pooled upstream connection is kept, in seconds
    /// Default: 90
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,
    /// Maximum idle pooled connections kept to the upstream
    /// Default: 32
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle: usize,
}

/// Locale routing configuration
///
/// The supported set and the country table are fixed for the lifetime of the
/// process: they are read once at startup and never registered dynamically.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LocaleConfig {
    /// Locales that may prefix a route, e.g. ["en", "bg"]
    #[serde(default = "default_supported_locales")]
    pub supported: Vec<String>,
    /// Locale used when nothing else matches. Must be in `supported`.
    #[serde(default = "default_locale")]
    pub default: String,
    /// Name of the cookie that remembers the chosen locale
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Lifetime of the locale cookie in seconds
    /// Default: 31536000 (1 year)
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: u64,
    /// Path prefixes that are never localized (API routes, framework assets)
    #[serde(default = "default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,
    /// CDN headers carrying the visitor's ISO country code, checked in order
    #[serde(default = "default_country_headers")]
    pub country_headers: Vec<String>,
    /// ISO 3166 country code -> locale
    #[serde(default = "default_countries")]
    pub countries: BTreeMap<String, String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            supported: default_supported_locales(),
            default: default_locale(),
            cookie_name: default_cookie_name(),
            cookie_max_age_secs: default_cookie_max_age(),
            excluded_prefixes: default_excluded_prefixes(),
            country_headers: default_country_headers(),
            countries: default_countries(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How often expired entries are swept from memory, in seconds
    /// Default: 300 (5 minutes)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Rate-limited routes. Requests not matching any prefix are never limited.
    /// Routes are matched in order, first match wins.
    #[serde(default = "default_rate_limit_routes")]
    pub routes: Vec<RouteRateLimitConfig>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: default_sweep_interval(),
            routes: default_rate_limit_routes(),
        }
    }
}

/// Quota for one rate-limited route
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RouteRateLimitConfig {
    /// URL path prefix to match (e.g., "/api/waitlist")
    pub prefix: String,
    /// Maximum requests per client within one window
    pub limit: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    /// Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages
    /// Default: false
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

/// Timeout configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Upstream request timeout in milliseconds
    /// Default: 10000 (10 seconds)
    #[serde(default = "default_upstream_timeout")]
    pub upstream_ms: u64,
    /// Graceful shutdown timeout in seconds
    /// Default: 30
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_ms: default_upstream_timeout(),
            shutdown_secs: default_shutdown_timeout(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Port for the observability server (/metrics, /health, /ready, /live)
    /// Disabled when not set
    #[serde(default)]
    pub metrics_port: Option<u16>,
    /// Log level for the opentelemetry crates
    /// Default: "warn"
    #[serde(default = "default_otel_log_level")]
    pub otel_log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { metrics_port: None, otel_log_level: default_otel_log_level() }
    }
}

fn default_true() -> bool {
    true
}

fn default_supported_locales() -> Vec<String> {
    vec!["en".to_string(), "bg".to_string()]
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_cookie_name() -> String {
    "indecisive-locale".to_string()
}

fn default_cookie_max_age() -> u64 {
    31536000 // 1 year
}

fn default_excluded_prefixes() -> Vec<String> {
    vec!["/api".to_string(), "/_next".to_string(), "/favicon.ico".to_string()]
}

fn default_country_headers() -> Vec<String> {
    // Vercel first, then Cloudflare
    vec!["x-vercel-ip-country".to_string(), "cf-ipcountry".to_string()]
}

fn default_countries() -> BTreeMap<String, String> {
    [
        ("BG", "bg"),
        ("US", "en"),
        ("GB", "en"),
        ("IE", "en"),
        ("CA", "en"),
        ("AU", "en"),
        ("NZ", "en"),
    ]
    .into_iter()
    .map(|(country, locale)| (country.to_string(), locale.to_string()))
    .collect()
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_rate_limit_routes() -> Vec<RouteRateLimitConfig> {
    vec![RouteRateLimitConfig {
        prefix: "/api/waitlist".to_string(),
        limit: 5,
        window_ms: 60_000,
    }]
}

fn default_pool_idle_timeout() -> u64 {
    90
}

fn default_pool_max_idle() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_otel_log_level() -> String {
    "warn".to_string()
}

fn default_upstream_timeout() -> u64 {
    10_000
}

fn default_shutdown_timeout() -> u64 {
    30
}
