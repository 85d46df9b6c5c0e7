use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use indecisive_edge_lib::config::{
    Config, LocaleConfig, LoggingConfig, RateLimitConfig, RouteRateLimitConfig, TelemetryConfig,
    TimeoutConfig, UpstreamConfig,
};
use indecisive_edge_lib::serve;
use reqwest::header::{CACHE_CONTROL, LOCATION, SET_COOKIE, VARY};
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Upstream stand-in that echoes `{path_and_query}|{x-locale}` back.
async fn spawn_echo_upstream() -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let svc = hyper::service::service_fn(|req: Request<Incoming>| async move {
                    let locale = req
                        .headers()
                        .get("x-locale")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-")
                        .to_string();
                    let path = req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
                    let body = format!("{path}|{locale}");
                    Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(body))))
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });

    Ok(addr)
}

fn gateway_config(upstream: SocketAddr, waitlist_limit: u32) -> Config {
    Config {
        listen: SocketAddr::from(([127, 0, 0, 1], 0)),
        upstream: UpstreamConfig {
            address: upstream.to_string(),
            preserve_host: false,
            pool_idle_timeout_secs: 90,
            pool_max_idle: 8,
        },
        production: false,
        locale: LocaleConfig::default(),
        rate_limit: RateLimitConfig {
            enabled: true,
            sweep_interval_secs: 300,
            routes: vec![RouteRateLimitConfig {
                prefix: "/api/waitlist".to_string(),
                limit: waitlist_limit,
                window_ms: 60_000,
            }],
        },
        logging: LoggingConfig::default(),
        timeout: TimeoutConfig { upstream_ms: 2_000, shutdown_secs: 1 },
        telemetry: TelemetryConfig::default(),
    }
}

struct Gateway {
    base: String,
    shutdown: CancellationToken,
    handle: JoinHandle<indecisive_edge_lib::Result<()>>,
}

async fn start_gateway(config: Config) -> Result<Gateway, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(serve(listener, Arc::new(config), None, shutdown.clone()));
    Ok(Gateway { base, shutdown, handle })
}

fn client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
}

fn header<'a>(resp: &'a reqwest::Response, name: impl reqwest::header::AsHeaderName) -> &'a str {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[tokio::test]
async fn test_localized_path_reaches_upstream_with_locale() -> TestResult {
    let upstream = spawn_echo_upstream().await?;
    let gw = start_gateway(gateway_config(upstream, 5)).await?;

    let resp = client()?.get(format!("{}/bg/shop?size=m", gw.base)).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await?, "/bg/shop?size=m|bg");

    gw.shutdown.cancel();
    gw.handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_unprefixed_path_is_redirected_by_country() -> TestResult {
    let upstream = spawn_echo_upstream().await?;
    let gw = start_gateway(gateway_config(upstream, 5)).await?;

    let resp = client()?
        .get(format!("{}/shop", gw.base))
        .header("cf-ipcountry", "BG")
        .send()
        .await?;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&resp, LOCATION), "/bg/shop");
    assert!(header(&resp, SET_COOKIE).starts_with("indecisive-locale=bg;"));
    assert_eq!(header(&resp, VARY), "Cookie, Accept-Language");
    assert_eq!(header(&resp, CACHE_CONTROL), "private, no-cache");

    gw.shutdown.cancel();
    gw.handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_api_requests_bypass_locale_routing() -> TestResult {
    let upstream = spawn_echo_upstream().await?;
    let gw = start_gateway(gateway_config(upstream, 5)).await?;

    let resp = client()?
        .get(format!("{}/api/products", gw.base))
        .header("accept-language", "bg")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("x-ratelimit-limit").is_none());
    assert_eq!(resp.text().await?, "/api/products|-");

    gw.shutdown.cancel();
    gw.handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_waitlist_is_rate_limited_per_client() -> TestResult {
    let upstream = spawn_echo_upstream().await?;
    let gw = start_gateway(gateway_config(upstream, 2)).await?;
    let client = client()?;
    let url = format!("{}/api/waitlist", gw.base);

    for expected_remaining in ["1", "0"] {
        let resp = client.post(&url).header("x-forwarded-for", "198.51.100.4").send().await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "x-ratelimit-limit"), "2");
        assert_eq!(header(&resp, "x-ratelimit-remaining"), expected_remaining);
        assert!(header(&resp, "x-ratelimit-reset").parse::<u64>().is_ok());
    }

    let resp = client.post(&url).header("x-forwarded-for", "198.51.100.4").send().await?;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = header(&resp, "retry-after").parse()?;
    assert!((1..=60).contains(&retry_after), "retry-after {retry_after}");
    assert_eq!(header(&resp, "x-ratelimit-remaining"), "0");
    assert_eq!(header(&resp, "content-type"), "application/json");
    let body: serde_json::Value = resp.json().await?;
    assert!(body.get("error").is_some());

    // A different client has its own budget.
    let resp = client.post(&url).header("x-forwarded-for", "198.51.100.5").send().await?;
    assert_eq!(resp.status(), StatusCode::OK);

    gw.shutdown.cancel();
    gw.handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() -> TestResult {
    // Bind then drop to get a port nothing listens on.
    let dead = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let gw = start_gateway(gateway_config(dead, 5)).await?;

    let resp = client()?.get(format!("{}/en/shop", gw.base)).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    gw.shutdown.cancel();
    gw.handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_accepting() -> TestResult {
    let upstream = spawn_echo_upstream().await?;
    let gw = start_gateway(gateway_config(upstream, 5)).await?;
    let base = gw.base.clone();

    gw.shutdown.cancel();
    let stopped = tokio::time::timeout(Duration::from_secs(5), gw.handle).await;
    assert!(matches!(stopped, Ok(Ok(Ok(())))), "gateway should stop cleanly");

    let after = client()?.get(format!("{base}/en")).send().await;
    assert!(after.is_err(), "listener should be closed after shutdown");
    Ok(())
}
