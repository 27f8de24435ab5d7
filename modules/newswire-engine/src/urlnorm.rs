//! URL normalization for identity comparison.
//!
//! The normalized form is a comparison key, never displayed. Normalization is
//! deterministic and idempotent; input that cannot be parsed degrades to a
//! trimmed, lowercased copy instead of failing.

/// Query parameters that vary per-click without changing the target page.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_content",
    "utm_term",
    "ref",
    "source",
];

/// Normalize a URL for comparison: lowercase scheme and host, strip a leading
/// `www.`, drop tracking parameters, strip the trailing slash and fragment.
pub fn normalize_url(url: &str) -> String {
    parse_normalized(url).unwrap_or_else(|| url.trim().to_lowercase())
}

fn parse_normalized(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw.trim()).ok()?;

    // Url::parse already lowercases scheme and host.
    let scheme = parsed.scheme();
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let port = match parsed.port() {
        Some(port) => format!(":{port}"),
        None => String::new(),
    };

    let path = parsed.path().trim_end_matches('/');

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let query = if kept.is_empty() {
        String::new()
    } else {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish();
        format!("?{encoded}")
    };

    // Fragment is dropped by reassembly.
    Some(format!("{scheme}://{host}{port}{path}{query}"))
}
