#![forbid(unsafe_code)]

use clap::Parser;
use indecisive_edge_lib::config::load_from_path;
use indecisive_edge_lib::telemetry::{init_metrics, init_tracing_with_otel, start_observability_server};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Indecisive Wear edge gateway (locale routing + rate limiting)")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "INDECISIVE_EDGE_CONFIG",
        default_value = "config/edge.toml"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            if init_tracing_with_otel("info", false, "warn").is_err() {
                eprintln!("failed to load configuration: {err}");
            }
            error!(%err, path = %cli.config.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing_with_otel(
        &cfg.logging.level,
        cfg.logging.show_target,
        &cfg.telemetry.otel_log_level,
    ) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    info!(
        ?cfg.listen,
        upstream = %cfg.upstream.address,
        rate_limited_routes = cfg.rate_limit.routes.len(),
        production = cfg.production,
        "configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let observability_stop = CancellationToken::new();

    let metrics = match cfg.telemetry.metrics_port {
        Some(port) => match init_metrics() {
            Ok((metrics, registry)) => {
                let draining = shutdown.clone();
                let stop = observability_stop.clone();
                tokio::spawn(async move {
                    if let Err(err) = start_observability_server(port, registry, draining, stop).await
                    {
                        error!(%err, "observability server exited with error");
                    }
                });
                Some(metrics)
            }
            Err(err) => {
                warn!(%err, "failed to initialize metrics, continuing without them");
                None
            }
        },
        None => None,
    };

    let cfg = Arc::new(cfg);
    let result = indecisive_edge_lib::run(cfg, metrics, shutdown).await;
    observability_stop.cancel();

    if let Err(err) = result {
        error!(%err, "edge gateway exited with error");
        std::process::exit(1);
    }
}
