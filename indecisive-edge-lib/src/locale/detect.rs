use super::accept_language::negotiate_accept_language;
use super::LocaleSettings;

/// Raw locale hints pulled from a request. Every field is optional and
/// untrusted; invalid values simply fall through to the next source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionInput<'a> {
    /// Value of the `?locale=` query parameter
    pub query: Option<&'a str>,
    /// Value of the locale cookie
    pub cookie: Option<&'a str>,
    /// Raw `Accept-Language` header
    pub accept_language: Option<&'a str>,
    /// ISO country code from the CDN
    pub country: Option<&'a str>,
}

/// Where a detected locale came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleSource {
    Query,
    Cookie,
    AcceptLanguage,
    Country,
    Default,
}

impl LocaleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocaleSource::Query => "query",
            LocaleSource::Cookie => "cookie",
            LocaleSource::AcceptLanguage => "accept_language",
            LocaleSource::Country => "country",
            LocaleSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedLocale<'s> {
    pub locale: &'s str,
    pub source: LocaleSource,
}

/// Run the detection chain. First match wins; never fails.
pub fn detect_locale<'s>(input: &DetectionInput<'_>, settings: &'s LocaleSettings) -> DetectedLocale<'s> {
    if let Some(locale) = input.query.and_then(|q| settings.resolve(q)) {
        return DetectedLocale { locale, source: LocaleSource::Query };
    }

    if let Some(locale) = input.cookie.and_then(|c| settings.resolve(c)) {
        return DetectedLocale { locale, source: LocaleSource::Cookie };
    }

    if let Some(locale) = input
        .accept_language
        .and_then(|header| negotiate_accept_language(header, settings))
    {
        return DetectedLocale { locale, source: LocaleSource::AcceptLanguage };
    }

    if let Some(locale) = input.country.and_then(|c| settings.locale_for_country(c)) {
        return DetectedLocale { locale, source: LocaleSource::Country };
    }

    DetectedLocale { locale: settings.default_locale(), source: LocaleSource::Default }
}
