use http::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use serde_json::{json, Value};

use crate::error::{EdgeError, Result};
use crate::proxy::synthetic_response::{full_body, RespBody};

fn json_response(status: StatusCode, body: &Value) -> Result<Response<RespBody>> {
    let body_bytes = serde_json::to_vec(body)
        .map_err(|e| EdgeError::Http(format!("Failed to serialize probe response: {e}")))?;

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full_body(body_bytes))
        .map_err(|e| EdgeError::Http(format!("Failed to build probe response: {e}")))
}

/// `/health`: 200 whenever the process is up
pub fn health_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "healthy"}))
}

/// `/ready`: 200 while the gateway accepts traffic, 503 once it is draining
pub fn ready_check_response(draining: bool) -> Result<Response<RespBody>> {
    if draining {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({"status": "not_ready", "reason": "shutting_down"}),
        )
    } else {
        json_response(StatusCode::OK, &json!({"status": "ready"}))
    }
}

pub fn live_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "alive"}))
}
