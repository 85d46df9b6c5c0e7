use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;
use std::time::SystemTime;
use tokio::time::Instant;

use crate::proxy::context::EdgeContext;
use crate::proxy::forwarding::{forward, ForwardConfig};
use crate::proxy::handler::headers::add_forwarded_headers;
use crate::proxy::handler::locale_routing::apply_locale_routing;
use crate::proxy::handler::rate_limit_validation::{
    apply_rate_limit_headers, check_rate_limit, RateLimitCheck,
};
use crate::proxy::http_result::HttpResult;
use crate::proxy::synthetic_response::RespBody;
use crate::telemetry::metrics::values;
use http::StatusCode;

/// Handle one gateway request: rate limit, locale routing, then forward.
pub async fn handle_edge_request(
    req: Request<Incoming>,
    ctx: &EdgeContext,
    peer: SocketAddr,
) -> HttpResult<Response<RespBody>> {
    let start = Instant::now();
    let method = req.method().to_string();
    let protocol = format!("{:?}", req.version());
    let metrics = ctx.metrics.as_ref();

    let rate_limit =
        check_rate_limit(&ctx.rate_limits, req.uri().path(), peer, req.headers(), metrics);
    let route = ctx
        .rate_limits
        .rule_for(req.uri().path())
        .map(|rule| rule.prefix.clone())
        .unwrap_or_else(|| values::ROUTE_NONE.to_string());

    let result = match rate_limit {
        RateLimitCheck::Limited(resp) => Ok(resp),
        RateLimitCheck::Unlimited => route_and_forward(req, ctx, peer).await,
        RateLimitCheck::Allowed(limit_result) => {
            route_and_forward(req, ctx, peer).await.map(|mut resp| {
                apply_rate_limit_headers(resp.headers_mut(), &limit_result, SystemTime::now());
                resp
            })
        }
    };

    let duration = start.elapsed().as_secs_f64();
    let status_code = match &result {
        Ok(resp) => resp.status().as_u16(),
        Err(e) => StatusCode::from(e).as_u16(),
    };

    if let Some(m) = metrics {
        if let Err(ref e) = result {
            m.record_error(e.error_type());
        }
        m.record_request(&method, status_code, &protocol, &route, duration);
    }

    result
}

async fn route_and_forward(
    mut req: Request<Incoming>,
    ctx: &EdgeContext,
    peer: SocketAddr,
) -> HttpResult<Response<RespBody>> {
    if let Some(redirect) = apply_locale_routing(&ctx.locale, &mut req, ctx.metrics.as_ref())? {
        return Ok(redirect);
    }

    add_forwarded_headers(&mut req, peer, false);

    forward(
        req,
        &ctx.client,
        ForwardConfig {
            upstream: &ctx.upstream,
            timeout: ctx.upstream_timeout,
            metrics: ctx.metrics.as_ref(),
        },
    )
    .await
}
