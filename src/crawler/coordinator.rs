//! Crawl orchestrator - bounded recursive link following
//!
//! This module contains the recursive traversal that turns one fetched HTML
//! page into a result tree, including:
//! - Content extraction through the HTML parser
//! - Link resolution, deduplication and filtering
//! - Depth limit, link budget and visited-set checks per link
//! - Paced fetching of followed links
//! - Dispatch of fetched resources to the HTML or document handlers
//! - Encoding per-branch failures into the tree

use crate::crawler::classify::{classify, ContentKind};
use crate::crawler::fetcher::fetch_url;
use crate::crawler::parser::{parse_html, ExtractionLimits};
use crate::crawler::result::{Children, LinkMap, LinkOutcome, PageResult};
use crate::crawler::scheduler::RateLimiter;
use crate::documents::{self, DocumentForm};
use crate::output::OutputFormat;
use crate::state::CrawlState;
use crate::url::{visit_key, LinkFilter};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

/// Body used when a page has no paragraph text
pub const NO_TEXT_PLACEHOLDER: &str = "<p>No significant text was found on the page.</p>\n";

/// Title used when a page has no `<title>`
pub const UNTITLED: &str = "Untitled";

/// Immutable traversal parameters for one top-level request
#[derive(Debug, Clone)]
pub struct CrawlParameters {
    /// Body-size cutoff for extracted text, in bytes
    pub max_content_size: usize,

    /// Maximum link hops from the root page; 0 disables recursion
    pub max_depth: u32,

    /// Maximum recursive fetches for the whole crawl; None is unbounded
    pub max_links: Option<usize>,

    /// Only links matching this filter are listed or followed
    pub link_filter: Option<LinkFilter>,

    /// Requested response format; selects the document conversion shape
    pub output_format: OutputFormat,

    /// Minimum time between recursive requests
    pub request_rate_delay: Duration,

    /// Number of images collected per page
    pub max_images: usize,
}

impl Default for CrawlParameters {
    fn default() -> Self {
        Self {
            max_content_size: 300 * 1024,
            max_depth: 0,
            max_links: None,
            link_filter: None,
            output_format: OutputFormat::default(),
            request_rate_delay: Duration::from_millis(500),
            max_images: 5,
        }
    }
}

impl CrawlParameters {
    fn extraction_limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            max_content_size: self.max_content_size,
            max_images: self.max_images,
        }
    }

    /// Shape of converted documents for the requested output format
    pub fn document_form(&self) -> DocumentForm {
        if self.output_format.is_html() {
            DocumentForm::HtmlFragment
        } else {
            DocumentForm::Text
        }
    }
}

/// Drives one top-level crawl
///
/// A `Crawler` is built per request. It owns its rate limiter; the visited
/// set and link counter live in the `CrawlState` passed to [`Crawler::crawl`].
pub struct Crawler {
    client: Client,
    headers: HeaderMap,
    params: CrawlParameters,
    limiter: RateLimiter,
}

impl Crawler {
    /// Creates a crawler for one request
    ///
    /// The rate limiter's clock starts now, which should be right after the
    /// root fetch.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `headers` - Caller-supplied headers, sent with every recursive fetch
    /// * `params` - Traversal parameters
    pub fn new(client: Client, headers: HeaderMap, params: CrawlParameters) -> Self {
        let limiter = RateLimiter::started(params.request_rate_delay);
        Self {
            client,
            headers,
            params,
            limiter,
        }
    }

    /// Crawls a page whose HTML has already been fetched
    ///
    /// Returns None when `url` was already visited in this crawl. Otherwise
    /// the URL is claimed, its content extracted and, when `max_depth > 0`,
    /// its qualifying links followed recursively.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the page (base for relative links)
    /// * `html` - Page body
    /// * `depth` - Link hops from the root; the root is 0
    /// * `state` - Visited set and link counter for this crawl
    pub async fn crawl(
        &mut self,
        url: &Url,
        html: &str,
        depth: u32,
        state: &mut CrawlState,
    ) -> Option<PageResult> {
        if !state.claim(url) {
            tracing::debug!("Already visited {}, skipping", url);
            return None;
        }

        Some(self.crawl_page(url, html, depth, state).await)
    }

    /// Extracts a claimed page and assembles its children
    fn crawl_page<'a>(
        &'a mut self,
        url: &'a Url,
        html: &'a str,
        depth: u32,
        state: &'a mut CrawlState,
    ) -> Pin<Box<dyn Future<Output = PageResult> + Send + 'a>> {
        Box::pin(async move {
            let parsed = parse_html(html, url, &self.params.extraction_limits());
            let links = self.qualifying_links(parsed.links);

            tracing::debug!(
                "Extracted {} at depth {}: {} bytes of text, {} images, {} qualifying links",
                url,
                depth,
                parsed.body_html.len(),
                parsed.images.len(),
                links.len()
            );

            let children = if self.params.max_depth == 0 {
                Children::Listed(links.iter().map(Url::to_string).collect())
            } else {
                let mut map = LinkMap::new();
                for link in &links {
                    if let Some(outcome) = self.follow_link(link, depth, state).await {
                        tracing::debug!("{} -> {}", link, outcome.status());
                        map.insert(link.to_string(), outcome);
                    }
                }
                Children::Followed(map)
            };

            let body_html = if parsed.body_html.is_empty() {
                NO_TEXT_PLACEHOLDER.to_string()
            } else {
                parsed.body_html
            };

            PageResult {
                url: url.to_string(),
                title: parsed.title.unwrap_or_else(|| UNTITLED.to_string()),
                body_html,
                images: parsed.images,
                links: children,
            }
        })
    }

    /// Deduplicates links (by normalized form, first occurrence wins) and
    /// applies the link filter
    fn qualifying_links(&self, links: Vec<Url>) -> Vec<Url> {
        let mut seen = HashSet::new();

        links
            .into_iter()
            .filter(|link| seen.insert(visit_key(link)))
            .filter(|link| {
                self.params
                    .link_filter
                    .as_ref()
                    .map_or(true, |filter| filter.matches(link.as_str()))
            })
            .collect()
    }

    /// Decides the outcome of one link, fetching it when allowed
    ///
    /// Returns None for fetched resources of an unsupported type; those are
    /// left out of the children entirely.
    async fn follow_link(
        &mut self,
        link: &Url,
        depth: u32,
        state: &mut CrawlState,
    ) -> Option<LinkOutcome> {
        if depth >= self.params.max_depth {
            return Some(LinkOutcome::SkippedDepthLimit);
        }
        if state.is_visited(link) {
            return Some(LinkOutcome::SkippedAlreadyVisited);
        }
        if !state.record_follow() {
            return Some(LinkOutcome::SkippedBudgetExhausted);
        }
        state.claim(link);

        self.limiter.wait().await;

        let resource = match fetch_url(&self.client, Method::GET, link, &self.headers).await {
            Ok(resource) => resource,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", link, e);
                return Some(LinkOutcome::Error {
                    message: e.to_string(),
                });
            }
        };

        // Redirect targets count as visited too
        let redirected = visit_key(&resource.final_url) != visit_key(link);
        if redirected && !state.claim(&resource.final_url) {
            tracing::debug!(
                "{} redirected to already visited {}",
                link,
                resource.final_url
            );
            return Some(LinkOutcome::SkippedAlreadyVisited);
        }

        match classify(&resource.content_type) {
            ContentKind::Html => {
                let html = resource.text();
                let page = self
                    .crawl_page(&resource.final_url, &html, depth + 1, state)
                    .await;
                Some(LinkOutcome::Fetched(page))
            }
            kind if kind.is_document() => Some(self.convert_document(kind, resource.body).await),
            kind => {
                tracing::debug!(
                    "Dropping {} with unsupported content type '{}' ({})",
                    link,
                    resource.content_type,
                    kind.label()
                );
                None
            }
        }
    }

    /// Converts a document body off the async runtime
    async fn convert_document(&self, kind: ContentKind, body: Vec<u8>) -> LinkOutcome {
        match documents::convert_blocking(kind, body, self.params.document_form()).await {
            Ok(content) => LinkOutcome::Document {
                content,
                media_type: kind.media_type().to_string(),
            },
            Err(e) => {
                tracing::warn!("{}", e);
                LinkOutcome::Error {
                    message: e.to_string(),
                }
            }
        }
    }
}
