use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const ROUTE: &str = "route";
    pub const PROTOCOL: &str = "protocol";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const DECISION: &str = "decision";
    pub const LOCALE: &str = "locale";
    pub const SOURCE: &str = "source";
    pub const UPSTREAM: &str = "upstream";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const ERROR_RATE_LIMITED: &str = "rate_limited";
    pub const DECISION_PASS_THROUGH: &str = "pass_through";
    pub const DECISION_LOCALIZED: &str = "localized";
    pub const DECISION_REDIRECT: &str = "redirect";
    /// Route label for requests that matched no rate-limited prefix
    pub const ROUTE_NONE: &str = "none";
}

#[derive(Clone)]
pub struct Metrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,

    pub requests_total: Counter<u64>,
    pub requests_duration_seconds: Histogram<f64>,

    // Locale middleware
    pub locale_decisions_total: Counter<u64>,

    // Rate limiting metrics
    pub rate_limit_requests_total: Counter<u64>,
    pub rate_limit_allowed_total: Counter<u64>,
    pub rate_limit_rejected_total: Counter<u64>,
    pub rate_limit_sweeps_total: Counter<u64>,
    pub rate_limit_swept_entries_total: Counter<u64>,
    pub rate_limit_entries: Gauge<u64>,

    pub upstream_requests_total: Counter<u64>,
    pub upstream_errors_total: Counter<u64>,
    pub upstream_duration_seconds: Histogram<f64>,

    pub errors_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    fn new(meter: Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("indecisive_edge_connections_total")
                .with_description("Total number of connections accepted")
                .build(),
            connections_active: meter
                .i64_up_down_counter("indecisive_edge_connections_active")
                .with_description("Number of active connections")
                .build(),

            requests_total: meter
                .u64_counter("indecisive_edge_requests_total")
                .with_description("Total number of requests processed")
                .build(),
            requests_duration_seconds: meter
                .f64_histogram("indecisive_edge_requests_duration_seconds")
                .with_description("Request duration in seconds")
                .build(),

            locale_decisions_total: meter
                .u64_counter("indecisive_edge_locale_decisions_total")
                .with_description("Locale middleware outcomes. decision=pass_through|localized|redirect")
                .build(),

            rate_limit_requests_total: meter
                .u64_counter("indecisive_edge_rate_limit_requests_total")
                .with_description("Total number of requests evaluated by rate limiter")
                .build(),
            rate_limit_allowed_total: meter
                .u64_counter("indecisive_edge_rate_limit_allowed_total")
                .with_description("Total number of requests allowed by rate limiter")
                .build(),
            rate_limit_rejected_total: meter
                .u64_counter("indecisive_edge_rate_limit_rejected_total")
                .with_description("Total number of requests rejected by rate limiter (429)")
                .build(),
            rate_limit_sweeps_total: meter
                .u64_counter("indecisive_edge_rate_limit_sweeps_total")
                .with_description("Total number of expired-entry sweeps run")
                .build(),
            rate_limit_swept_entries_total: meter
                .u64_counter("indecisive_edge_rate_limit_swept_entries_total")
                .with_description("Total number of expired rate limit entries removed")
                .build(),
            rate_limit_entries: meter
                .u64_gauge("indecisive_edge_rate_limit_entries")
                .with_description("Identifiers tracked by the rate limiter after the last sweep")
                .build(),

            upstream_requests_total: meter
                .u64_counter("indecisive_edge_upstream_requests_total")
                .with_description("Total number of requests forwarded to the upstream")
                .build(),
            upstream_errors_total: meter
                .u64_counter("indecisive_edge_upstream_errors_total")
                .with_description("Total number of upstream errors")
                .build(),
            upstream_duration_seconds: meter
                .f64_histogram("indecisive_edge_upstream_duration_seconds")
                .with_description("Upstream request duration in seconds")
                .build(),

            errors_total: meter
                .u64_counter("indecisive_edge_errors_total")
                .with_description("Total number of errors")
                .build(),

            build_info: meter
                .u64_gauge("indecisive_edge_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_connection_opened(&self) {
        self.connections_total.add(1, &[]);
        self.connections_active.add(1, &[]);
    }

    pub fn record_connection_closed(&self) {
        self.connections_active.add(-1, &[]);
    }

    pub fn record_rate_limit_request(&self, route: &str) {
        self.rate_limit_requests_total
            .add(1, &[KeyValue::new(labels::ROUTE, route.to_string())]);
    }

    pub fn record_rate_limit_allowed(&self, route: &str) {
        self.rate_limit_allowed_total
            .add(1, &[KeyValue::new(labels::ROUTE, route.to_string())]);
    }

    pub fn record_rate_limit_rejection(&self, route: &str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, values::ERROR_RATE_LIMITED)]);
        self.rate_limit_rejected_total
            .add(1, &[KeyValue::new(labels::ROUTE, route.to_string())]);
    }

    pub fn record_rate_limit_sweep(&self, removed: u64, remaining: u64) {
        self.rate_limit_sweeps_total.add(1, &[]);
        if removed > 0 {
            self.rate_limit_swept_entries_total.add(removed, &[]);
        }
        self.rate_limit_entries.record(remaining, &[]);
    }

    pub fn record_locale_decision(&self, decision: &str, locale: &str, source: &str) {
        self.locale_decisions_total.add(
            1,
            &[
                KeyValue::new(labels::DECISION, decision.to_string()),
                KeyValue::new(labels::LOCALE, locale.to_string()),
                KeyValue::new(labels::SOURCE, source.to_string()),
            ],
        );
    }

    pub fn record_upstream_request(&self, upstream: &str, status_code: u16, duration: f64) {
        let attrs = [
            KeyValue::new(labels::UPSTREAM, upstream.to_string()),
            KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
        ];
        self.upstream_requests_total.add(1, &attrs);
        self.upstream_duration_seconds.record(duration, &attrs);
    }

    pub fn record_upstream_error(&self, upstream: &str, error_type: &str) {
        self.upstream_errors_total.add(
            1,
            &[
                KeyValue::new(labels::UPSTREAM, upstream.to_string()),
                KeyValue::new(labels::ERROR_TYPE, error_type.to_string()),
            ],
        );
    }

    pub fn record_request(
        &self,
        method: &str,
        status_code: u16,
        protocol: &str,
        route: &str,
        duration: f64,
    ) {
        let attrs = [
            KeyValue::new(labels::METHOD, method.to_string()),
            KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
            KeyValue::new(labels::PROTOCOL, protocol.to_string()),
            KeyValue::new(labels::ROUTE, route.to_string()),
        ];
        self.requests_total.add(1, &attrs);
        self.requests_duration_seconds.record(duration, &attrs);
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type.to_string())]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("indecisive-edge");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
