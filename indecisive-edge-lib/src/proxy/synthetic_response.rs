use bytes::Bytes;
use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::Response;

use crate::error::{EdgeError, Result};

pub type RespBody = BoxBody<Bytes, hyper::Error>;

/// Build HTTP response with status code of 4xx and 5xx
pub(crate) fn synthetic_error_response(status_code: StatusCode) -> Result<Response<RespBody>> {
    Response::builder()
        .status(status_code)
        .body(empty_body())
        .map_err(|e| EdgeError::Http(format!("Failed to build error response: {e}")))
}

/// Last-resort response when even the synthetic builder fails
pub(crate) fn bare_response(status_code: StatusCode) -> Response<RespBody> {
    let mut resp = Response::new(empty_body());
    *resp.status_mut() = status_code;
    resp
}

pub(crate) fn full_body(data: impl Into<Bytes>) -> RespBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn empty_body() -> RespBody {
    full_body(Bytes::new())
}

pub(crate) fn json_body(json: String) -> RespBody {
    full_body(json)
}
