//! Request parsing and validation
//!
//! Every field is checked before any network I/O happens; the first
//! problem found is reported as [`HarvestError::Validation`].

use crate::config::CrawlDefaults;
use crate::crawler::CrawlParameters;
use crate::output::{OutputFormat, RenderOptions};
use crate::url::{ensure_scheme, LinkFilter};
use crate::HarvestError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

/// Longest accepted pause between recursive requests, in seconds
const MAX_RATE_LIMIT_SECS: f64 = 60.0;

/// A validated scrape request
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// Root URL, with `https://` prepended when the caller gave no scheme
    pub url: Url,

    /// Method used for the root fetch
    pub method: Method,

    /// Caller headers, sent with the root fetch and every recursive fetch
    pub headers: HeaderMap,

    pub format: OutputFormat,

    /// Body-size cutoff in KiB
    pub max_size_kib: usize,

    /// Maximum link hops from the root page
    pub max_level: u32,

    /// Maximum recursive fetches; None is unbounded
    pub max_recursion_links: Option<usize>,

    pub link_filter: Option<LinkFilter>,

    /// Include image URLs in the response
    pub images: bool,

    /// Include upstream response headers in the response
    pub output_headers: bool,

    /// JSONPath queries applied to the embedded application state
    pub metadata_filters: Vec<String>,

    /// Delay between recursive requests; None uses the configured default
    pub rate_limit: Option<Duration>,
}

impl ScrapeRequest {
    /// Parses a raw request body
    ///
    /// An empty (or all-whitespace) body is treated as `{}`, which then
    /// fails for the missing `url`.
    pub fn from_body(body: &[u8], defaults: &CrawlDefaults) -> Result<Self, HarvestError> {
        let value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(body)
                .map_err(|e| invalid(format!("request body is not valid JSON: {}", e)))?
        };

        Self::from_value(&value, defaults)
    }

    /// Validates a parsed request body
    pub fn from_value(value: &Value, defaults: &CrawlDefaults) -> Result<Self, HarvestError> {
        let body = value
            .as_object()
            .ok_or_else(|| invalid("request body must be a JSON object"))?;

        let url = match body.get("url") {
            Some(Value::String(raw)) if !raw.trim().is_empty() => ensure_scheme(raw)
                .map_err(|e| invalid(format!("invalid 'url': {}", e)))?,
            Some(Value::Null) | None => return Err(invalid("parameter 'url' is required")),
            Some(_) => return Err(invalid("'url' must be a non-empty string")),
        };

        let method = match body.get("method") {
            None | Some(Value::Null) => Method::GET,
            Some(Value::String(name)) => Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes())
                .map_err(|_| invalid(format!("invalid 'method': {}", name)))?,
            Some(_) => return Err(invalid("'method' must be a string")),
        };

        let format = match body.get("format") {
            None | Some(Value::Null) => defaults.default_format,
            Some(Value::String(name)) => name
                .parse::<OutputFormat>()
                .map_err(|e| invalid(format!("invalid 'format': {}", e)))?,
            Some(_) => return Err(invalid("'format' must be a string")),
        };

        let link_filter = match body.get("link_exp_filter") {
            None | Some(Value::Null) => None,
            Some(Value::String(pattern)) if pattern.is_empty() => None,
            Some(Value::String(pattern)) => Some(
                LinkFilter::new(pattern)
                    .map_err(|e| invalid(format!("invalid 'link_exp_filter': {}", e)))?,
            ),
            Some(_) => return Err(invalid("'link_exp_filter' must be a string")),
        };

        let max_level = optional_count(body, "max_level")?.unwrap_or(0);
        let max_level = u32::try_from(max_level)
            .map_err(|_| invalid("'max_level' is too large"))?;

        Ok(Self {
            url,
            method,
            headers: parse_headers(body.get("headers"))?,
            format,
            max_size_kib: optional_count(body, "maxsize")?
                .unwrap_or(defaults.max_content_size_kib),
            max_level,
            max_recursion_links: optional_count(body, "max_recursion_links")?,
            link_filter,
            images: optional_bool(body, "images")?.unwrap_or(true),
            output_headers: optional_bool(body, "output_headers")?.unwrap_or(false),
            metadata_filters: parse_metadata_filters(body.get("metadata_filters"))?,
            rate_limit: parse_rate_limit(body.get("rate_limit"))?,
        })
    }

    /// Traversal parameters for this request
    ///
    /// The `metadata` format never recurses; it only reports the root page.
    pub fn crawl_parameters(&self, defaults: &CrawlDefaults) -> CrawlParameters {
        let max_depth = if self.format == OutputFormat::Metadata {
            0
        } else {
            self.max_level
        };

        CrawlParameters {
            max_content_size: self.max_size_kib.saturating_mul(1024),
            max_depth,
            max_links: self.max_recursion_links,
            link_filter: self.link_filter.clone(),
            output_format: self.format,
            request_rate_delay: self
                .rate_limit
                .unwrap_or_else(|| Duration::from_millis(defaults.request_rate_delay_ms)),
            max_images: defaults.max_images,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            format: self.format,
            include_images: self.images,
            include_headers: self.output_headers,
        }
    }
}

fn invalid(message: impl Into<String>) -> HarvestError {
    HarvestError::Validation(message.into())
}

/// Merges an array of single-key objects into one header map
///
/// Later entries replace earlier ones with the same name.
fn parse_headers(value: Option<&Value>) -> Result<HeaderMap, HarvestError> {
    let mut headers = HeaderMap::new();

    let entries = match value {
        None | Some(Value::Null) => return Ok(headers),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(invalid(
                "'headers' must be an array of objects with a single string value",
            ))
        }
    };

    for entry in entries {
        let object = match entry.as_object() {
            Some(object) if object.len() == 1 => object,
            _ => {
                return Err(invalid(
                    "each 'headers' entry must be an object with exactly one key",
                ))
            }
        };

        for (name, value) in object {
            let value = value
                .as_str()
                .ok_or_else(|| invalid(format!("header '{}' must have a string value", name)))?;
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| invalid(format!("invalid header name '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| invalid(format!("invalid value for header '{}'", name)))?;
            headers.insert(name, value);
        }
    }

    Ok(headers)
}

/// Reads a non-negative integer given as a JSON number or a numeric string
fn optional_count(body: &Map<String, Value>, key: &str) -> Result<Option<usize>, HarvestError> {
    let error = || invalid(format!("'{}' must be a non-negative integer", key));

    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(error),
        Some(Value::String(s)) => s.trim().parse::<usize>().map(Some).map_err(|_| error()),
        Some(_) => Err(error()),
    }
}

fn optional_bool(body: &Map<String, Value>, key: &str) -> Result<Option<bool>, HarvestError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(format!("'{}' must be a boolean", key))),
    }
}

fn parse_metadata_filters(value: Option<&Value>) -> Result<Vec<String>, HarvestError> {
    let error = || invalid("'metadata_filters' must be an array of strings");

    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(error))
            .collect(),
        Some(_) => Err(error()),
    }
}

/// Reads `rate_limit` as seconds, from a number or a numeric string
fn parse_rate_limit(value: Option<&Value>) -> Result<Option<Duration>, HarvestError> {
    let error = || invalid("'rate_limit' must be a non-negative number of seconds");

    let seconds = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(error)?,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| error())?,
        Some(_) => return Err(error()),
    };

    if seconds > MAX_RATE_LIMIT_SECS {
        return Err(invalid(format!(
            "'rate_limit' must be at most {} seconds, got {}",
            MAX_RATE_LIMIT_SECS, seconds
        )));
    }

    Duration::try_from_secs_f64(seconds)
        .map(Some)
        .map_err(|_| error())
}
