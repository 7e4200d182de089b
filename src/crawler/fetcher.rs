//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Issuing one request and capturing status, headers and raw body
//! - Classifying transport failures (timeouts vs. everything else)

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::HarvestError;
use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client, Method};
use std::time::Duration;
use url::Url;

/// A fetched resource, whatever its status code
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// URL the request was issued for
    pub requested_url: Url,

    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value (empty when absent)
    pub content_type: String,

    /// Response headers, in the order received
    pub headers: Vec<(String, String)>,

    /// Raw response body
    pub body: Vec<u8>,
}

impl FetchedResource {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// True when the upstream answered with a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `config` - Timeouts and redirect policy
///
/// # Example
///
/// ```no_run
/// use page_harvest::config::{FetcherConfig, UserAgentConfig};
/// use page_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    config: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    let redirect = if config.max_redirects == 0 {
        Policy::none()
    } else {
        Policy::limited(config.max_redirects)
    };

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs one HTTP request
///
/// Non-2xx responses are still returned as `Ok`: the caller decides what an
/// upstream error status means. Only transport failures (DNS, connect, TLS,
/// timeout, body read) become errors.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `method` - Request method
/// * `url` - The URL to fetch
/// * `headers` - Extra request headers supplied by the caller
pub async fn fetch_url(
    client: &Client,
    method: Method,
    url: &Url,
    headers: &HeaderMap,
) -> Result<FetchedResource, HarvestError> {
    tracing::debug!("{} {}", method, url);

    let response = client
        .request(method, url.clone())
        .headers(headers.clone())
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status_code = response.status().as_u16();
    let final_url = response.url().clone();

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let response_headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = response
        .bytes()
        .await
        .map_err(|e| classify_error(url, e))?
        .to_vec();

    tracing::debug!(
        "{} -> {} ({}, {} bytes)",
        url,
        status_code,
        if content_type.is_empty() { "no content-type" } else { content_type.as_str() },
        body.len()
    );

    Ok(FetchedResource {
        requested_url: url.clone(),
        final_url,
        status_code,
        content_type,
        headers: response_headers,
        body,
    })
}

/// Maps a transport error to the crate error type
fn classify_error(url: &Url, error: reqwest::Error) -> HarvestError {
    if error.is_timeout() {
        HarvestError::Timeout {
            url: url.to_string(),
        }
    } else {
        HarvestError::Fetch {
            url: url.to_string(),
            source: error,
        }
    }
}
