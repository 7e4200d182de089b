//! URL handling module for Page-Harvest
//!
//! This module provides scheme defaulting for caller-supplied URLs,
//! normalization used to key the visited set, and the regex link filter.

mod filter;
mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use filter::LinkFilter;
pub use normalize::normalize_url;

/// Parses a caller-supplied URL, defaulting the scheme to `https`
///
/// Anything that does not already start with `http://` or `https://`
/// (case-insensitive) gets `https://` prepended before parsing.
///
/// # Examples
///
/// ```
/// use page_harvest::url::ensure_scheme;
///
/// let url = ensure_scheme("example.com").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/");
///
/// let url = ensure_scheme("http://example.com/a").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a");
/// ```
pub fn ensure_scheme(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();

    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Resolves an `href` against the page it was found on
///
/// Returns None for links that can never be fetched: empty or
/// fragment-only hrefs, `javascript:`, `mailto:`, `tel:` and `data:` URIs,
/// and anything that doesn't resolve to http(s). The fragment is dropped.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);

    Some(absolute)
}

/// Returns the key a URL is tracked under in the visited set
///
/// Falls back to the plain string form when normalization rejects the URL,
/// so every URL still gets a stable key.
pub fn visit_key(url: &Url) -> String {
    normalize_url(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
