use hyper::header::{HeaderName, HeaderValue, HOST};
use hyper::Request;
use std::net::SocketAddr;

use crate::locale::LOCALE_HEADER;

pub mod forwarded {
    pub const FOR: &str = "x-forwarded-for";
    pub const HOST: &str = "x-forwarded-host";
    pub const PORT: &str = "x-forwarded-port";
    pub const PROTO: &str = "x-forwarded-proto";
}

/// Add X-Forwarded-* headers to the request
///
/// 1. Appends the peer IP to X-Forwarded-For (or creates it if missing)
/// 2. Sets X-Forwarded-Host from the request's Host header
/// 3. Sets X-Forwarded-Port from the peer's port
/// 4. Sets X-Forwarded-Proto based on `is_https`
pub fn add_forwarded_headers<B>(req: &mut Request<B>, peer: SocketAddr, is_https: bool) {
    let client_ip = peer.ip().to_string();
    let forwarded_for = match req
        .headers()
        .get(forwarded::FOR)
        .and_then(|v| v.to_str().ok())
    {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {client_ip}"),
        _ => client_ip,
    };
    if let Ok(header_value) = HeaderValue::from_str(&forwarded_for) {
        req.headers_mut().insert(forwarded::FOR, header_value);
    }

    if let Some(host) = req.headers().get(HOST).cloned() {
        req.headers_mut().insert(forwarded::HOST, host);
    }

    req.headers_mut()
        .insert(forwarded::PORT, HeaderValue::from(peer.port()));

    let proto = if is_https { "https" } else { "http" };
    req.headers_mut()
        .insert(forwarded::PROTO, HeaderValue::from_static(proto));
}

/// Attach the resolved locale for the upstream. Overwrites any client-sent value.
pub fn set_locale_header<B>(req: &mut Request<B>, locale: &str) {
    match HeaderValue::from_str(locale) {
        Ok(value) => {
            req.headers_mut()
                .insert(HeaderName::from_static(LOCALE_HEADER), value);
        }
        Err(_) => {
            req.headers_mut().remove(LOCALE_HEADER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        ([192, 0, 2, 10], 51000).into()
    }

    #[test]
    fn creates_forwarded_headers() -> Result<(), http::Error> {
        let mut req = Request::builder()
            .uri("/en/shop")
            .header(HOST, "shop.example")
            .body(())?;
        add_forwarded_headers(&mut req, peer(), false);

        let headers = req.headers();
        assert_eq!(headers.get(forwarded::FOR).and_then(|v| v.to_str().ok()), Some("192.0.2.10"));
        assert_eq!(
            headers.get(forwarded::HOST).and_then(|v| v.to_str().ok()),
            Some("shop.example")
        );
        assert_eq!(headers.get(forwarded::PORT).and_then(|v| v.to_str().ok()), Some("51000"));
        assert_eq!(headers.get(forwarded::PROTO).and_then(|v| v.to_str().ok()), Some("http"));
        Ok(())
    }

    #[test]
    fn appends_to_existing_forwarded_for() -> Result<(), http::Error> {
        let mut req = Request::builder()
            .uri("/")
            .header(forwarded::FOR, "203.0.113.1")
            .body(())?;
        add_forwarded_headers(&mut req, peer(), true);

        let headers = req.headers();
        assert_eq!(
            headers.get(forwarded::FOR).and_then(|v| v.to_str().ok()),
            Some("203.0.113.1, 192.0.2.10")
        );
        assert_eq!(headers.get(forwarded::PROTO).and_then(|v| v.to_str().ok()), Some("https"));
        Ok(())
    }

    #[test]
    fn locale_header_replaces_client_value() -> Result<(), http::Error> {
        let mut req = Request::builder()
            .uri("/bg")
            .header(LOCALE_HEADER, "xx")
            .body(())?;
        set_locale_header(&mut req, "bg");
        let values: Vec<_> = req.headers().get_all(LOCALE_HEADER).iter().collect();
        assert_eq!(values, vec!["bg"]);
        Ok(())
    }
}
