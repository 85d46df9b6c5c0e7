//! Locale routing for storefront page requests.
//!
//! Every page is served under a locale prefix (`/en/...`, `/bg/...`). Requests
//! without one are redirected after the visitor's locale is detected from, in
//! order:
//!
//! 1. an explicit `?locale=` query parameter
//! 2. the locale cookie written by a previous redirect
//! 3. the `Accept-Language` header
//! 4. a CDN country header (`x-vercel-ip-country`, `cf-ipcountry`)
//! 5. the default locale
//!
//! The detection chain itself ([`detect_locale`]) is a pure function over
//! already-extracted strings, so it can be exercised without any HTTP types.
//! [`LocaleMiddleware`] does the extraction and turns the outcome into a
//! [`LocaleDecision`].

mod accept_language;
mod cookie;
mod detect;
mod middleware;

pub use accept_language::{negotiate_accept_language, parse_accept_language};
pub use cookie::{cookie_value, locale_cookie};
pub use detect::{detect_locale, DetectedLocale, DetectionInput, LocaleSource};
pub use middleware::{looks_like_locale_tag, LocaleDecision, LocaleMiddleware, PathLocale};

use ahash::AHashMap;
use http::HeaderName;

use crate::config::LocaleConfig;
use crate::error::{EdgeError, Result};

/// Request header carrying the resolved locale to the upstream
pub const LOCALE_HEADER: &str = "x-locale";

/// Query parameter that forces a locale
pub const LOCALE_QUERY_PARAM: &str = "locale";

/// Immutable locale tables handed to the middleware at construction time.
///
/// Locales are stored lowercase. Country codes are stored uppercase.
#[derive(Debug, Clone)]
pub struct LocaleSettings {
    supported: Vec<String>,
    default_locale: String,
    countries: AHashMap<String, String>,
    cookie_name: String,
    cookie_max_age_secs: u64,
    secure_cookie: bool,
    excluded_prefixes: Vec<String>,
    country_headers: Vec<HeaderName>,
}

impl LocaleSettings {
    /// Settings with the given locale set and stock defaults for everything
    /// else (no country table, `indecisive-locale` cookie valid for a year,
    /// `/api`, `/_next` and `/favicon.ico` excluded).
    pub fn new<S: AsRef<str>>(supported: &[S], default_locale: &str) -> Result<Self> {
        let defaults = LocaleConfig::default();
        let config = LocaleConfig {
            supported: supported.iter().map(|s| s.as_ref().to_string()).collect(),
            default: default_locale.to_string(),
            countries: Default::default(),
            ..defaults
        };
        Self::from_config(&config, false)
    }

    /// Build settings from configuration. `production` marks the cookie `Secure`.
    pub fn from_config(config: &LocaleConfig, production: bool) -> Result<Self> {
        let supported: Vec<String> = config
            .supported
            .iter()
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        if supported.is_empty() {
            return Err(EdgeError::Locale("no supported locales".into()));
        }

        let default_locale = config.default.trim().to_ascii_lowercase();
        if !supported.contains(&default_locale) {
            return Err(EdgeError::Locale(format!(
                "default locale '{default_locale}' is not supported"
            )));
        }

        let country_headers = config
            .country_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes()).map_err(|e| {
                    EdgeError::Locale(format!("invalid country header name '{name}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let settings = Self {
            supported,
            default_locale,
            countries: AHashMap::new(),
            cookie_name: config.cookie_name.clone(),
            cookie_max_age_secs: config.cookie_max_age_secs,
            secure_cookie: production,
            excluded_prefixes: config.excluded_prefixes.clone(),
            country_headers,
        };

        settings.with_countries(config.countries.iter())
    }

    /// Replace the country table. Every target locale must be supported.
    pub fn with_countries<I, C, L>(mut self, countries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (C, L)>,
        C: AsRef<str>,
        L: AsRef<str>,
    {
        let mut table = AHashMap::new();
        for (country, locale) in countries {
            let locale = locale.as_ref().trim().to_ascii_lowercase();
            if !self.supported.contains(&locale) {
                return Err(EdgeError::Locale(format!(
                    "country '{}' maps to unsupported locale '{locale}'",
                    country.as_ref()
                )));
            }
            table.insert(country.as_ref().trim().to_ascii_uppercase(), locale);
        }
        self.countries = table;
        Ok(self)
    }

    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Exact, case-sensitive membership test. Used for URL prefixes.
    pub fn is_supported(&self, candidate: &str) -> bool {
        self.supported.iter().any(|l| l == candidate)
    }

    /// Case-insensitive lookup returning the canonical (stored) spelling.
    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        let candidate = candidate.trim();
        self.supported
            .iter()
            .find(|l| l.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }

    pub fn locale_for_country(&self, country: &str) -> Option<&str> {
        self.countries
            .get(&country.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn cookie_max_age_secs(&self) -> u64 {
        self.cookie_max_age_secs
    }

    pub fn secure_cookie(&self) -> bool {
        self.secure_cookie
    }

    pub fn excluded_prefixes(&self) -> &[String] {
        &self.excluded_prefixes
    }

    pub fn country_headers(&self) -> &[HeaderName] {
        &self.country_headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_resolves_locales() -> Result<()> {
        let settings = LocaleSettings::new(&["EN", " bg "], "en")?;
        assert_eq!(settings.supported(), &["en".to_string(), "bg".to_string()]);
        assert_eq!(settings.resolve("BG"), Some("bg"));
        assert!(settings.is_supported("bg"));
        assert!(!settings.is_supported("BG"));
        assert_eq!(settings.resolve("fr"), None);
        Ok(())
    }

    #[test]
    fn rejects_unsupported_default() {
        assert!(LocaleSettings::new(&["en"], "bg").is_err());
        assert!(LocaleSettings::new::<&str>(&[], "en").is_err());
    }

    #[test]
    fn country_table_is_case_insensitive() -> Result<()> {
        let settings = LocaleSettings::new(&["en", "bg"], "en")?.with_countries([("bg", "BG")])?;
        assert_eq!(settings.locale_for_country("BG"), Some("bg"));
        assert_eq!(settings.locale_for_country("bg"), Some("bg"));
        assert_eq!(settings.locale_for_country("DE"), None);
        Ok(())
    }

    #[test]
    fn country_table_rejects_unsupported_target() -> Result<()> {
        let settings = LocaleSettings::new(&["en"], "en")?;
        assert!(settings.with_countries([("FR", "fr")]).is_err());
        Ok(())
    }

    #[test]
    fn from_config_uses_stock_tables() -> Result<()> {
        let settings = LocaleSettings::from_config(&LocaleConfig::default(), true)?;
        assert_eq!(settings.default_locale(), "en");
        assert_eq!(settings.locale_for_country("BG"), Some("bg"));
        assert_eq!(settings.cookie_name(), "indecisive-locale");
        assert_eq!(settings.cookie_max_age_secs(), 31536000);
        assert!(settings.secure_cookie());
        assert_eq!(settings.country_headers().len(), 2);
        assert_eq!(settings.country_headers()[0].as_str(), "x-vercel-ip-country");
        Ok(())
    }
}
