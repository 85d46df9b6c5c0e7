use crate::proxy::synthetic_response::{full_body, RespBody};
use crate::telemetry::{
    handle_metrics, health_check_response, live_check_response, ready_check_response,
};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn plain_response(status: StatusCode, text: &'static str) -> Response<RespBody> {
    let mut resp = Response::new(full_body(text));
    *resp.status_mut() = status;
    resp
}

fn route_probe(path: &str, registry: &Registry, draining: bool) -> Response<RespBody> {
    let result = match path {
        "/health" => health_check_response(),
        "/ready" => ready_check_response(draining),
        "/live" => live_check_response(),
        "/metrics" => handle_metrics(registry),
        _ => return plain_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    match result {
        Ok(resp) => resp,
        Err(e) => {
            warn!(path, error = %e, "Observability server: failed to build response");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Serve `/metrics`, `/health`, `/ready` and `/live` on `port`.
///
/// `/ready` turns 503 as soon as `draining` is cancelled, but probes keep
/// being answered until `stop` is cancelled.
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    draining: CancellationToken,
    stop: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Arc::new(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(?addr, "Observability server started (metrics + health checks)");

    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                info!("Observability server: shutdown requested");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let draining = draining.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let registry = registry.clone();
                        let is_draining = draining.is_cancelled();
                        async move {
                            Ok::<_, hyper::Error>(route_probe(req.uri().path(), &registry, is_draining))
                        }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}
