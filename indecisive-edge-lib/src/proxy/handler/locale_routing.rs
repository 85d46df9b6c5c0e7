use http::header::{CACHE_CONTROL, LOCATION, SET_COOKIE, VARY};
use http::{HeaderValue, StatusCode};
use hyper::{Request, Response};
use std::sync::Arc;

use crate::locale::{locale_cookie, LocaleDecision, LocaleMiddleware, LocaleSettings};
use crate::proxy::handler::headers::set_locale_header;
use crate::proxy::http_result::{HttpError, HttpResult};
use crate::proxy::synthetic_response::{empty_body, RespBody};
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Run the locale middleware on `req`.
///
/// Returns `Some(307)` when the visitor must be redirected to a localized
/// path. Otherwise the request is annotated in place (`x-locale`) or left
/// untouched, and `None` is returned.
pub fn apply_locale_routing<B>(
    middleware: &LocaleMiddleware,
    req: &mut Request<B>,
    metrics: Option<&Arc<Metrics>>,
) -> HttpResult<Option<Response<RespBody>>> {
    match middleware.decide(req.uri(), req.headers()) {
        LocaleDecision::PassThrough => {
            if let Some(m) = metrics {
                m.record_locale_decision(values::DECISION_PASS_THROUGH, "", "");
            }
            Ok(None)
        }
        LocaleDecision::Localized { locale } => {
            if let Some(m) = metrics {
                m.record_locale_decision(values::DECISION_LOCALIZED, &locale, "path");
            }
            set_locale_header(req, &locale);
            Ok(None)
        }
        LocaleDecision::Redirect { location, locale, source } => {
            if let Some(m) = metrics {
                m.record_locale_decision(values::DECISION_REDIRECT, &locale, source.as_str());
            }
            redirect_response(middleware.settings(), &location, &locale).map(Some)
        }
    }
}

/// 307 to `location` remembering `locale` in the cookie.
pub fn redirect_response(
    settings: &LocaleSettings,
    location: &str,
    locale: &str,
) -> HttpResult<Response<RespBody>> {
    let location = HeaderValue::from_str(location)
        .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(e.to_string()))?;
    let cookie = HeaderValue::from_str(&locale_cookie(settings, locale))
        .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(e.to_string()))?;

    Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(LOCATION, location)
        .header(SET_COOKIE, cookie)
        .header(VARY, HeaderValue::from_static("Cookie, Accept-Language"))
        .header(CACHE_CONTROL, HeaderValue::from_static("private, no-cache"))
        .body(empty_body())
        .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::LOCALE_HEADER;

    fn middleware() -> LocaleMiddleware {
        let settings = LocaleSettings::new(&["en", "bg"], "en")
            .and_then(|s| s.with_countries([("BG", "bg")]))
            .unwrap_or_else(|e| panic!("settings: {e}"));
        LocaleMiddleware::new(settings)
    }

    #[test]
    fn localized_request_gets_header() -> Result<(), Box<dyn std::error::Error>> {
        let mut req = Request::builder().uri("/bg/shop").body(())?;
        let redirect = apply_locale_routing(&middleware(), &mut req, None)?;
        assert!(redirect.is_none());
        assert_eq!(req.headers().get(LOCALE_HEADER).and_then(|v| v.to_str().ok()), Some("bg"));
        Ok(())
    }

    #[test]
    fn unprefixed_request_is_redirected() -> Result<(), Box<dyn std::error::Error>> {
        let mut req = Request::builder()
            .uri("/shop?color=red")
            .header("cf-ipcountry", "BG")
            .body(())?;
        let resp = apply_locale_routing(&middleware(), &mut req, None)?
            .ok_or("expected a redirect")?;

        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        let h = resp.headers();
        assert_eq!(h.get(LOCATION).and_then(|v| v.to_str().ok()), Some("/bg/shop?color=red"));
        assert_eq!(
            h.get(SET_COOKIE).and_then(|v| v.to_str().ok()),
            Some("indecisive-locale=bg; Path=/; Max-Age=31536000; SameSite=Lax")
        );
        assert_eq!(h.get(VARY).and_then(|v| v.to_str().ok()), Some("Cookie, Accept-Language"));
        Ok(())
    }

    #[test]
    fn accept_language_redirect_sets_cookie() -> Result<(), Box<dyn std::error::Error>> {
        let mut req = Request::builder()
            .uri("/shop?size=m")
            .header("accept-language", "fr-FR,en;q=0.8")
            .body(())?;
        let resp = apply_locale_routing(&middleware(), &mut req, None)?
            .ok_or("expected a redirect")?;

        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        let h = resp.headers();
        assert_eq!(h.get(LOCATION).and_then(|v| v.to_str().ok()), Some("/en/shop?size=m"));
        assert_eq!(
            h.get(SET_COOKIE).and_then(|v| v.to_str().ok()),
            Some("indecisive-locale=en; Path=/; Max-Age=31536000; SameSite=Lax")
        );
        Ok(())
    }

    #[test]
    fn excluded_request_is_untouched() -> Result<(), Box<dyn std::error::Error>> {
        let mut req = Request::builder().uri("/api/waitlist").body(())?;
        let before = req.headers().clone();
        let redirect = apply_locale_routing(&middleware(), &mut req, None)?;
        assert!(redirect.is_none());
        assert_eq!(req.headers(), &before);
        Ok(())
    }
}
