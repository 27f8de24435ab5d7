//! Vendor domain detection for primary selection.
//!
//! Official vendor outlets (a model vendor's own blog) are preferred as the
//! cluster primary so the first-party account is shown ahead of coverage.
//! This is a tie-break signal only, never an identity signal.

const VENDOR_DOMAINS: &[&str] = &[
    "openai.com",
    "anthropic.com",
    "deepmind.google",
    "deepmind.com",
    "blogs.microsoft.com",
    "ai.meta.com",
    "about.fb.com",
    "stability.ai",
    "mistral.ai",
    "x.ai",
    "huggingface.co",
    "blog.google",
    "nvidia.com",
];

/// True if the URL's host is a vendor domain or a subdomain of one.
/// Unparseable URLs are simply not vendor URLs.
pub fn is_vendor_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    VENDOR_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_domain_matches() {
        assert!(is_vendor_url("https://openai.com/blog/gpt-5"));
        assert!(is_vendor_url("https://www.anthropic.com/news"));
    }

    #[test]
    fn vendor_subdomain_matches() {
        assert!(is_vendor_url("https://research.nvidia.com/paper"));
    }

    #[test]
    fn news_outlet_is_not_vendor() {
        assert!(!is_vendor_url("https://techcrunch.com/2026/01/01/gpt-5"));
    }

    #[test]
    fn suffix_lookalike_is_not_vendor() {
        assert!(!is_vendor_url("https://notopenai.com/post"));
    }

    #[test]
    fn malformed_url_is_not_vendor() {
        assert!(!is_vendor_url("not a url"));
    }
}
