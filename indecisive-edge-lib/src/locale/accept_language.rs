//! `Accept-Language` parsing and matching.

use super::LocaleSettings;

/// Parse an Accept-Language header value into (language, quality) pairs,
/// sorted by quality descending. Equal qualities keep their header order.
///
/// Missing quality values default to 1.0; values are clamped to 0.0..=1.0
/// (RFC 7231 §5.3.1). Tags are lowercased.
pub fn parse_accept_language(header: &str) -> Vec<(String, f32)> {
    let mut langs: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }

            let mut segments = part.split(';');
            let lang = segments.next()?.trim().to_ascii_lowercase();
            if lang.is_empty() {
                return None;
            }

            let quality = segments
                .find_map(|s| {
                    s.trim()
                        .strip_prefix("q=")
                        .and_then(|q| q.trim().parse::<f32>().ok())
                })
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);

            Some((lang, quality))
        })
        .collect();

    langs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    langs
}

/// Pick the best supported locale for an Accept-Language header.
///
/// Each tag is tried as-is and then by its primary subtag (`en-US` -> `en`).
/// Tags with `q=0` are "not acceptable" and never match.
pub fn negotiate_accept_language<'s>(header: &str, settings: &'s LocaleSettings) -> Option<&'s str> {
    for (lang, quality) in parse_accept_language(header) {
        if quality <= 0.0 {
            continue;
        }
        if let Some(locale) = settings.resolve(&lang) {
            return Some(locale);
        }
        if let Some(primary) = lang.split('-').next() {
            if let Some(locale) = settings.resolve(primary) {
                return Some(locale);
            }
        }
    }
    None
}
