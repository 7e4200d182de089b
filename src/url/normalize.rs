use crate::UrlError;
use url::Url;

/// Click-tracking parameters that never select a different resource
///
/// Any `utm_*` parameter is dropped as well.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid"];

/// Normalizes a URL into the form used as its visited-set key
///
/// Parsing already lowercases the host, drops default ports and resolves
/// `.` and `..` segments. On top of that this:
///
/// - rejects anything but http(s) URLs with a host
/// - drops the fragment
/// - collapses repeated slashes and removes the trailing slash (the root
///   path stays `/`)
/// - removes tracking parameters and sorts the rest of the query
///
/// The scheme and any `www.` prefix are kept, so `http://` and `https://`
/// variants stay distinct keys.
///
/// # Examples
///
/// ```
/// use page_harvest::url::normalize_url;
/// use url::Url;
///
/// let url = Url::parse("https://EXAMPLE.COM/page/?b=2&a=1&utm_source=x#top").unwrap();
/// assert_eq!(normalize_url(&url).unwrap().as_str(), "https://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url: &Url) -> Result<Url, UrlError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    let mut key = url.clone();
    key.set_fragment(None);

    let path = collapse_path(key.path());
    key.set_path(&path);

    let params = retained_params(&key);
    if params.is_empty() {
        key.set_query(None);
    } else {
        key.query_pairs_mut()
            .clear()
            .extend_pairs(params.iter().map(|(name, value)| (name.as_str(), value.as_str())));
    }

    Ok(key)
}

/// Drops empty segments, which also removes the trailing slash
fn collapse_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Query pairs without tracking parameters, sorted by key then value
fn retained_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    params.sort();
    params
}

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}
