use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{EdgeError, Result};
use crate::proxy::context::EdgeContext;
use crate::proxy::handler::handle_edge_request;
use crate::proxy::synthetic_response::{bare_response, synthetic_error_response, RespBody};
use crate::security::rate_limit::spawn_sweeper;
use crate::telemetry::Metrics;

/// Guard to decrement active connections counter when dropped
struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionGuard {
    fn new(counter: Arc<AtomicUsize>, metrics: Option<Arc<Metrics>>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        if let Some(ref m) = metrics {
            m.record_connection_opened();
        }
        Self { counter, metrics }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
        if let Some(ref m) = self.metrics {
            m.record_connection_closed();
        }
    }
}

/// Bind the configured address and serve until SIGTERM, SIGINT or `shutdown`
/// is cancelled. A received signal cancels `shutdown`.
pub async fn run(
    config: Arc<Config>,
    metrics: Option<Arc<Metrics>>,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(config.listen).await.map_err(EdgeError::Io)?;

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        EdgeError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
    })?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
        EdgeError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
    })?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
            _ = signal_token.cancelled() => {}
        }
        signal_token.cancel();
    });

    serve(listener, config, metrics, shutdown).await
}

/// Accept loop on an already-bound listener. Returns after `shutdown` is
/// cancelled and in-flight connections have drained (or the drain timed out).
pub async fn serve(
    listener: TcpListener,
    config: Arc<Config>,
    metrics: Option<Arc<Metrics>>,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr().map_err(EdgeError::Io)?;
    let ctx = Arc::new(EdgeContext::from_config(&config, metrics.clone())?);
    let builder = ConnBuilder::new(TokioExecutor::new());
    let active_connections = Arc::new(AtomicUsize::new(0));

    let sweeper = if ctx.rate_limits.is_enabled() {
        Some(spawn_sweeper(
            ctx.rate_limits.limiter().clone(),
            Duration::from_secs(config.rate_limit.sweep_interval_secs),
            shutdown.child_token(),
            metrics.clone(),
        ))
    } else {
        None
    };

    info!(
        ?addr,
        upstream = %config.upstream.address,
        locales = ?ctx.locale.settings().supported(),
        "Edge gateway listening"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                let guard = ConnectionGuard::new(active_connections.clone(), metrics.clone());
                let builder = builder.clone();
                let ctx = ctx.clone();
                let conn_shutdown = shutdown.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let ctx = ctx.clone();
                        async move { Ok::<_, hyper::Error>(respond(req, &ctx, peer).await) }
                    });

                    let conn = builder.serve_connection(TokioIo::new(stream), svc);
                    tokio::pin!(conn);
                    let mut draining = false;

                    loop {
                        tokio::select! {
                            res = conn.as_mut() => {
                                if let Err(e) = res {
                                    debug!(?peer, error = %e, "serve_connection error");
                                }
                                break;
                            }
                            _ = conn_shutdown.cancelled(), if !draining => {
                                draining = true;
                                conn.as_mut().graceful_shutdown();
                            }
                        }
                    }
                });
            }
        }
    }

    drain_connections(&active_connections, Duration::from_secs(config.timeout.shutdown_secs))
        .await;

    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!(error = %e, "Rate limit sweeper task failed");
        }
    }

    info!("Edge gateway stopped");
    Ok(())
}

async fn respond(
    req: Request<Incoming>,
    ctx: &EdgeContext,
    peer: SocketAddr,
) -> hyper::Response<RespBody> {
    match handle_edge_request(req, ctx, peer).await {
        Ok(resp) => resp,
        Err(e) => {
            let status = hyper::StatusCode::from(&e);
            debug!(?peer, error = %e, %status, "Request failed");
            synthetic_error_response(status).unwrap_or_else(|_| bare_response(status))
        }
    }
}

async fn drain_connections(active_connections: &AtomicUsize, timeout: Duration) {
    info!(timeout_secs = timeout.as_secs(), "Waiting for active connections to finish");
    let start = std::time::Instant::now();

    loop {
        let active = active_connections.load(Ordering::Relaxed);
        if active == 0 {
            info!("All connections closed, shutdown complete");
            break;
        }

        if start.elapsed() >= timeout {
            warn!(
                active_connections = active,
                "Shutdown timeout reached, connections still active"
            );
            break;
        }

        debug!(active_connections = active, "Waiting for connections to close");
        sleep(Duration::from_millis(100)).await;
    }
}
