use std::sync::Arc;

use http::header::ACCEPT_LANGUAGE;
use http::{HeaderMap, Uri};
use tracing::debug;

use super::cookie::cookie_value;
use super::detect::{detect_locale, DetectionInput, LocaleSource};
use super::{LocaleSettings, LOCALE_QUERY_PARAM};

/// What the first path segment says about the locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLocale<'a> {
    /// `/bg/shop` with `bg` supported
    Supported(&'a str),
    /// `/fr/shop` with `fr` locale-shaped but unsupported; `rest` is `/shop`
    Unsupported { rest: &'a str },
    /// No locale-looking first segment
    Unprefixed,
}

/// Outcome of running the locale middleware on a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleDecision {
    /// Excluded or static path: forward untouched
    PassThrough,
    /// Already localized: forward with the locale attached
    Localized { locale: String },
    /// Redirect (307) to `location` and remember `locale` in the cookie
    Redirect { location: String, locale: String, source: LocaleSource },
}

/// Locale detection and redirect middleware.
///
/// Cheap to clone; the settings are shared.
#[derive(Debug, Clone)]
pub struct LocaleMiddleware {
    settings: Arc<LocaleSettings>,
}

impl LocaleMiddleware {
    pub fn new(settings: LocaleSettings) -> Self {
        Self { settings: Arc::new(settings) }
    }

    pub fn settings(&self) -> &LocaleSettings {
        &self.settings
    }

    /// API routes, framework assets and anything that looks like a file
    pub fn should_skip(&self, path: &str) -> bool {
        self.settings
            .excluded_prefixes()
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
            || path.contains('.')
    }

    /// Classify the first path segment.
    pub fn path_locale<'a>(&self, path: &'a str) -> PathLocale<'a> {
        let Some(trimmed) = path.strip_prefix('/') else {
            return PathLocale::Unprefixed;
        };

        let (candidate, rest) = match trimmed.find('/') {
            Some(pos) => (&trimmed[..pos], &trimmed[pos..]),
            None => (trimmed, ""),
        };

        if self.settings.is_supported(candidate) {
            return PathLocale::Supported(candidate);
        }

        if looks_like_locale_tag(candidate) {
            let rest = if rest.is_empty() { "/" } else { rest };
            return PathLocale::Unsupported { rest };
        }

        PathLocale::Unprefixed
    }

    /// Decide what to do with a request.
    pub fn decide(&self, uri: &Uri, headers: &HeaderMap) -> LocaleDecision {
        let path = uri.path();

        if self.should_skip(path) {
            return LocaleDecision::PassThrough;
        }

        let unlocalized = match self.path_locale(path) {
            PathLocale::Supported(locale) => {
                return LocaleDecision::Localized { locale: locale.to_string() };
            }
            PathLocale::Unsupported { rest } => {
                debug!(path, "stripping unsupported locale prefix");
                rest
            }
            PathLocale::Unprefixed => path,
        };

        let country = self.settings.country_headers().iter().find_map(|name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|c| !c.is_empty())
        });

        let input = DetectionInput {
            query: uri.query().and_then(query_locale),
            cookie: cookie_value(headers, self.settings.cookie_name()),
            accept_language: headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()),
            country,
        };
        let detected = detect_locale(&input, &self.settings);

        let location = localized_location(detected.locale, unlocalized, uri.query());
        debug!(
            path,
            locale = detected.locale,
            source = detected.source.as_str(),
            %location,
            "redirecting to localized path"
        );

        LocaleDecision::Redirect {
            location,
            locale: detected.locale.to_string(),
            source: detected.source,
        }
    }
}

/// Two-letter primary subtag with an optional two-letter or three-digit region,
/// e.g. `fr`, `de-AT`, `es-419`.
pub fn looks_like_locale_tag(segment: &str) -> bool {
    let (primary, region) = match segment.split_once('-') {
        Some((primary, region)) => (primary, Some(region)),
        None => (segment, None),
    };

    let primary_ok = primary.len() == 2 && primary.bytes().all(|b| b.is_ascii_alphabetic());
    let region_ok = match region {
        None => true,
        Some(r) => {
            (r.len() == 2 && r.bytes().all(|b| b.is_ascii_alphabetic()))
                || (r.len() == 3 && r.bytes().all(|b| b.is_ascii_digit()))
        }
    };

    primary_ok && region_ok
}

fn query_locale(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == LOCALE_QUERY_PARAM && !value.is_empty()).then_some(value)
    })
}

/// `/{locale}{path}` with the original query appended. The bare root maps to `/{locale}`.
fn localized_location(locale: &str, path: &str, query: Option<&str>) -> String {
    let path = if path == "/" { "" } else { path };
    match query {
        Some(q) if !q.is_empty() => format!("/{locale}{path}?{q}"),
        _ => format!("/{locale}{path}"),
    }
}
