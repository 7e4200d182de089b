//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching
//! - Content-type classification
//! - HTML content and link extraction
//! - Request pacing
//! - Bounded recursive crawl orchestration

mod classify;
mod coordinator;
mod fetcher;
mod parser;
mod result;
mod scheduler;

pub use classify::{classify, ContentKind};
pub use coordinator::{CrawlParameters, Crawler, NO_TEXT_PLACEHOLDER, UNTITLED};
pub use fetcher::{build_http_client, fetch_url, FetchedResource};
pub use parser::{parse_html, ExtractionLimits, ParsedPage};
pub use result::{Children, LinkMap, LinkOutcome, PageResult};
pub use scheduler::RateLimiter;
