use crate::output::OutputFormat;
use serde::Deserialize;

/// Main configuration structure for Page-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub crawl: CrawlDefaults,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the server listens on
    #[serde(rename = "bind-address", default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the scraper
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the scraper
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the scraper
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

/// Outbound HTTP behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Upper bound for a single request, in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound for establishing a connection, in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum redirect hops followed per request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Defaults applied to requests that don't override them
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlDefaults {
    /// Body-size cutoff for extracted text, in KiB
    #[serde(rename = "max-content-size-kib", default = "default_max_content_size_kib")]
    pub max_content_size_kib: usize,

    /// Number of images collected per page
    #[serde(rename = "max-images", default = "default_max_images")]
    pub max_images: usize,

    /// Minimum time between recursive requests (milliseconds)
    #[serde(rename = "request-rate-delay-ms", default = "default_rate_delay_ms")]
    pub request_rate_delay_ms: u64,

    /// Response format used when the request doesn't name one
    #[serde(rename = "default-format", default)]
    pub default_format: OutputFormat,
}

impl Default for CrawlDefaults {
    fn default() -> Self {
        Self {
            max_content_size_kib: default_max_content_size_kib(),
            max_images: default_max_images(),
            request_rate_delay_ms: default_rate_delay_ms(),
            default_format: OutputFormat::default(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_crawler_name() -> String {
    "PageHarvest".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_max_redirects() -> usize {
    10
}

fn default_max_content_size_kib() -> usize {
    300
}

fn default_max_images() -> usize {
    5
}

fn default_rate_delay_ms() -> u64 {
    500
}
