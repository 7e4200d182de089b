//! Page-Harvest: a bounded recursive page scraper
//!
//! This crate fetches a web page, extracts its readable content and, when
//! asked to, follows outbound links up to a bounded depth and link budget,
//! assembling every visited page (or converted PDF/DOCX/XLSX document) into
//! a single result tree.

pub mod config;
pub mod crawler;
pub mod documents;
pub mod metadata;
pub mod output;
pub mod service;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Page-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("HTTP error for {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Failed to convert {kind} document: {message}")]
    Conversion { kind: &'static str, message: String },

    #[error("Invalid metadata query '{query}': {message}")]
    FilterQuery { query: String, message: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl HarvestError {
    /// Returns true for errors caused by the caller's input rather than by
    /// upstream or internal failures
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Invalid link filter pattern: {0}")]
    InvalidFilter(String),
}

/// Result type alias for Page-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlParameters, Crawler, LinkOutcome, PageResult};
pub use output::OutputFormat;
pub use service::{ScrapeRequest, ScrapeResponse, Scraper};
pub use state::CrawlState;
pub use url::{ensure_scheme, normalize_url, LinkFilter};
