use http::header::COOKIE;
use http::HeaderMap;

use super::LocaleSettings;

/// Find a cookie by name across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key.trim() != name {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            (!value.is_empty()).then_some(value)
        })
}

/// `Set-Cookie` value remembering the chosen locale.
///
/// Readable from client scripts (no `HttpOnly`), `SameSite=Lax`, `Secure`
/// only in production.
pub fn locale_cookie(settings: &LocaleSettings, locale: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        settings.cookie_name(),
        locale,
        settings.cookie_max_age_secs()
    );
    if settings.secure_cookie() {
        cookie.push_str("; Secure");
    }
    cookie
}
