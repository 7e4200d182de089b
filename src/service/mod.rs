//! Scrape service: one request in, one response out
//!
//! The service validates the request, fetches the root resource, routes it
//! by content type (JSON and proxy short-circuits, document conversion, or
//! the crawl orchestrator), extracts embedded metadata and renders the
//! result in the requested format.

mod request;
mod response;
pub mod server;

pub use request::ScrapeRequest;
pub use response::{ScrapeResponse, CORS_HEADERS};

use crate::config::Config;
use crate::crawler::{build_http_client, classify, fetch_url, ContentKind, Crawler, FetchedResource};
use crate::documents::{self, DocumentForm};
use crate::metadata::{apply_filters, extract_metadata};
use crate::output::{render, Content, OutputFormat, Rendered, RootInfo, ScrapeOutcome};
use crate::state::CrawlState;
use crate::url::visit_key;
use crate::HarvestError;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

/// Handles scrape requests
///
/// Cheap to clone: the HTTP client and the configuration are shared. Each
/// request gets its own crawl state and rate limiter.
#[derive(Clone)]
pub struct Scraper {
    client: Client,
    config: Arc<Config>,
}

impl Scraper {
    /// Creates a scraper with an HTTP client built from `config`
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.user_agent, &config.fetcher)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: Config) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handles one raw request
    ///
    /// Never fails: validation problems become 400 responses, root fetch
    /// and assembly failures become 500 responses, and `OPTIONS` gets a
    /// bare preflight answer.
    pub async fn handle(&self, method: &str, body: &[u8]) -> ScrapeResponse {
        if method.eq_ignore_ascii_case("OPTIONS") {
            return ScrapeResponse::preflight();
        }

        let request = match ScrapeRequest::from_body(body, &self.config.crawl) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Rejected request: {}", e);
                return ScrapeResponse::error(400, &e.to_string());
            }
        };

        match self.scrape(&request).await {
            Ok(rendered) => ScrapeResponse::ok(rendered),
            Err(e) => {
                tracing::error!("Scrape of {} failed: {}", request.url, e);
                let status = if e.is_validation() { 400 } else { 500 };
                ScrapeResponse::error(status, &e.to_string())
            }
        }
    }

    /// Scrapes a validated request and renders the result
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<Rendered, HarvestError> {
        let outcome = self.collect(request).await?;
        Ok(render(&outcome, &request.render_options()))
    }

    /// Fetches the root resource and builds the canonical result
    pub async fn collect(&self, request: &ScrapeRequest) -> Result<ScrapeOutcome, HarvestError> {
        tracing::info!(
            "Scraping {} (format: {}, max level: {}, max links: {})",
            request.url,
            request.format,
            request.max_level,
            request
                .max_recursion_links
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
        );

        let resource = fetch_url(
            &self.client,
            request.method.clone(),
            &request.url,
            &request.headers,
        )
        .await?;

        let root = RootInfo {
            final_url: resource.final_url.to_string(),
            status_code: resource.status_code,
            content_type: resource.content_type.clone(),
            headers: resource.headers.clone(),
            fetched_at: Utc::now(),
        };

        if !resource.is_success() {
            tracing::info!(
                "{} answered with status {}, processing the body anyway",
                root.final_url,
                root.status_code
            );
        }

        let content = if request.format == OutputFormat::Proxy {
            Content::Raw(resource.body)
        } else {
            match classify(&resource.content_type) {
                ContentKind::Html => self.crawl_root(request, resource).await?,
                ContentKind::Json => Content::Json(pretty_json(resource.text())),
                kind if kind.is_document() => {
                    let form = request.crawl_parameters(&self.config.crawl).document_form();
                    convert_root_document(kind, resource.body, form).await
                }
                _ => Content::Raw(resource.body),
            }
        };

        Ok(ScrapeOutcome { root, content })
    }

    async fn crawl_root(
        &self,
        request: &ScrapeRequest,
        resource: FetchedResource,
    ) -> Result<Content, HarvestError> {
        let params = request.crawl_parameters(&self.config.crawl);
        let html = resource.text();

        let mut state = CrawlState::new(params.max_links);
        // The requested URL counts as visited when the root was redirected
        if visit_key(&resource.requested_url) != visit_key(&resource.final_url) {
            state.claim(&resource.requested_url);
        }

        let mut crawler = Crawler::new(self.client.clone(), request.headers.clone(), params);
        let page = crawler
            .crawl(&resource.final_url, &html, 0, &mut state)
            .await
            .ok_or_else(|| {
                HarvestError::Internal(format!("root page {} was already visited", resource.final_url))
            })?;

        tracing::info!(
            "Finished {}: {} recursive fetches, {} URLs visited",
            resource.final_url,
            state.links_followed(),
            state.visited_count()
        );

        let metadata = extract_metadata(&html);
        let filters = if request.metadata_filters.is_empty() {
            None
        } else {
            Some(apply_filters(&metadata.app_state, &request.metadata_filters))
        };

        Ok(Content::Page {
            page,
            metadata,
            filters,
        })
    }
}

/// Pretty-prints a JSON body, returning it unchanged when it doesn't parse
fn pretty_json(body: String) -> String {
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(body),
        Err(e) => {
            tracing::debug!("JSON response body did not parse, returning it raw: {}", e);
            body
        }
    }
}

/// Converts a root document; failures become the document's content
async fn convert_root_document(kind: ContentKind, body: Vec<u8>, form: DocumentForm) -> Content {
    let content = match documents::convert_blocking(kind, body, form).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("{}", e);
            match form {
                DocumentForm::Text => e.to_string(),
                DocumentForm::HtmlFragment => {
                    format!("<p>{}</p>\n", html_escape::encode_text(&e.to_string()))
                }
            }
        }
    };

    Content::Document {
        content,
        media_type: kind.media_type().to_string(),
    }
}
