use crate::config::UpstreamConfig;
use crate::proxy::http_result::{HttpError, HttpResult};
use crate::proxy::synthetic_response::RespBody;
use crate::telemetry::Metrics;
use http::{Request, Response, Version};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub type HttpClient = Client<HttpConnector, Incoming>;

pub struct ForwardConfig<'a> {
    pub upstream: &'a UpstreamConfig,
    pub timeout: Duration,
    pub metrics: Option<&'a Arc<Metrics>>,
}

/// Pooled HTTP/1.1 client for the upstream.
///
/// One client is built at startup and shared by every connection so upstream
/// connections are reused across requests.
pub fn create_client(upstream: &UpstreamConfig) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_nodelay(true);

    let mut builder = Client::builder(TokioExecutor::new());
    builder.pool_idle_timeout(Duration::from_secs(upstream.pool_idle_timeout_secs));
    builder.pool_max_idle_per_host(upstream.pool_max_idle);

    builder.build(connector)
}

/// `http://{upstream}{path_and_query}`
pub fn upstream_uri(upstream: &str, req_uri: &http::Uri) -> HttpResult<http::Uri> {
    let pq = req_uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("http://{upstream}{pq}")
        .parse::<http::Uri>()
        .map_err(|e| HttpError::InvalidUri(e.to_string()))
}

pub async fn forward(
    req: Request<Incoming>,
    client: &HttpClient,
    config: ForwardConfig<'_>,
) -> HttpResult<Response<RespBody>> {
    let start = Instant::now();
    let upstream = config.upstream.address.as_str();

    let uri = upstream_uri(upstream, req.uri())?;

    let (mut parts, body) = req.into_parts();
    parts.uri = uri;
    // Clients may speak h2 to the gateway; the upstream hop is always HTTP/1.1.
    parts.version = Version::HTTP_11;
    if !config.upstream.preserve_host {
        // Let the client derive Host from the upstream URI.
        parts.headers.remove(hyper::header::HOST);
    }

    let out_req = Request::from_parts(parts, body);

    let result = tokio::time::timeout(config.timeout, client.request(out_req)).await;
    let duration = start.elapsed().as_secs_f64();

    let error = match result {
        Ok(Ok(resp)) => {
            let status_code = resp.status().as_u16();
            debug!(upstream, status_code, duration, "Upstream responded");
            if let Some(m) = config.metrics {
                m.record_upstream_request(upstream, status_code, duration);
            }
            return Ok(resp.map(|b| b.boxed()));
        }
        Ok(Err(e)) => HttpError::UpstreamUnavailable(e.to_string()),
        Err(_) => {
            HttpError::UpstreamTimeout(u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX))
        }
    };

    warn!(upstream, error = %error, "Upstream request failed");
    if let Some(m) = config.metrics {
        m.record_upstream_error(upstream, error.error_type());
    }
    Err(error)
}
