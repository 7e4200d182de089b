//! Transport-neutral response returned by the scrape service

use crate::output::Rendered;
use serde_json::json;

/// CORS headers attached to every response
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
];

/// Status, headers and body of one scrape response
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ScrapeResponse {
    fn with_cors(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        let mut headers: Vec<(String, String)> = CORS_HEADERS
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        if let Some(content_type) = content_type {
            headers.push(("Content-Type".to_string(), content_type));
        }

        Self {
            status,
            headers,
            body,
        }
    }

    /// A 200 response carrying a rendered result
    pub fn ok(rendered: Rendered) -> Self {
        Self::with_cors(200, Some(rendered.content_type), rendered.body)
    }

    /// An error response with a `{"error": message}` body
    pub fn error(status: u16, message: &str) -> Self {
        let body = json!({ "error": message }).to_string().into_bytes();
        Self::with_cors(status, Some("application/json".to_string()), body)
    }

    /// The bare answer to a CORS preflight request
    pub fn preflight() -> Self {
        Self::with_cors(200, None, Vec::new())
    }

    /// First header value with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
