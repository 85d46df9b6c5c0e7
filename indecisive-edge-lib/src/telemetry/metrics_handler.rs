use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use prometheus::{Encoder, Registry, TextEncoder};

use crate::error::{EdgeError, Result};
use crate::proxy::synthetic_response::{full_body, RespBody};

/// Render every metric family in `registry` in the Prometheus text format.
pub fn handle_metrics(registry: &Registry) -> Result<Response<RespBody>> {
    let encoder = TextEncoder::new();
    let exposition = encoder
        .encode_to_string(&registry.gather())
        .map_err(|e| EdgeError::Http(format!("Failed to encode metrics: {e}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, encoder.format_type())
        .header(CACHE_CONTROL, "no-store")
        .body(full_body(exposition))
        .map_err(|e| EdgeError::Http(format!("Failed to build metrics response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use prometheus::IntCounter;

    #[tokio::test]
    async fn renders_registered_metrics() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let registry = Registry::new();
        let counter = IntCounter::new("edge_test_total", "test counter")?;
        registry.register(Box::new(counter.clone()))?;
        counter.inc_by(3);

        let resp = handle_metrics(&registry)?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/plain")));

        let body = resp.into_body().collect().await?.to_bytes();
        let text = String::from_utf8(body.to_vec())?;
        assert!(text.contains("edge_test_total 3"), "{text}");
        Ok(())
    }
}
