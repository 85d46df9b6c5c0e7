use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence when set. Otherwise `log_level` applies to
/// everything and `otel_log_level` to the OpenTelemetry crates, which are
/// noisy at `info`.
pub fn init_tracing_with_otel(
    log_level: &str,
    show_target: bool,
    otel_log_level: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "{log_level},opentelemetry={otel_log_level},opentelemetry_sdk={otel_log_level}"
        ))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(show_target)
        .try_init()
}
