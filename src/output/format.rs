//! Projection of a scrape result onto the requested response format

use crate::crawler::{Children, LinkOutcome, PageResult};
use crate::metadata::{filters_to_json, FilterOutcome, PageMetadata};
use crate::output::markdown::{html_to_text, page_markdown};
use crate::output::OutputFormat;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::fmt::Write as _;

/// Facts about the root fetch that every format may report
#[derive(Debug, Clone)]
pub struct RootInfo {
    /// URL of the root resource after redirects
    pub final_url: String,

    /// Upstream HTTP status code
    pub status_code: u16,

    /// Upstream Content-Type header value
    pub content_type: String,

    /// Upstream response headers
    pub headers: Vec<(String, String)>,

    /// When the root fetch completed
    pub fetched_at: DateTime<Utc>,
}

/// What the root resource turned into
#[derive(Debug, Clone)]
pub enum Content {
    /// An HTML page with its crawl tree and embedded metadata
    Page {
        page: PageResult,
        metadata: PageMetadata,
        /// Metadata filter results, when the request asked for any
        filters: Option<Vec<(String, FilterOutcome)>>,
    },

    /// A converted PDF/DOCX/XLSX document (or its conversion error text)
    Document { content: String, media_type: String },

    /// A JSON body, already pretty-printed when it parsed
    Json(String),

    /// An upstream body passed through untouched
    Raw(Vec<u8>),
}

/// The canonical result of one scrape request
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub root: RootInfo,
    pub content: Content,
}

/// Caller choices that shape the rendering
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub format: OutputFormat,

    /// Include image URLs
    pub include_images: bool,

    /// Include upstream response headers
    pub include_headers: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_images: true,
            include_headers: false,
        }
    }
}

/// A response body and its content type
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Rendered {
    fn json(value: &Value) -> Self {
        Self {
            content_type: "application/json".to_string(),
            body: serde_json::to_vec_pretty(value).unwrap_or_default(),
        }
    }

    fn html(document: String) -> Self {
        Self {
            content_type: "text/html; charset=utf-8".to_string(),
            body: document.into_bytes(),
        }
    }

    fn text(text: String) -> Self {
        Self {
            content_type: "text/plain; charset=utf-8".to_string(),
            body: text.into_bytes(),
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Renders a scrape result in the requested format
///
/// JSON and raw bodies ignore the format: they are returned as they came,
/// except that `metadata` still answers with an (empty) metadata envelope.
pub fn render(outcome: &ScrapeOutcome, options: &RenderOptions) -> Rendered {
    let root = &outcome.root;

    match (&outcome.content, options.format) {
        (Content::Raw(body), _) => Rendered {
            content_type: raw_content_type(&root.content_type),
            body: body.clone(),
        },
        (_, OutputFormat::Metadata) => Rendered::json(&metadata_envelope(outcome)),
        (Content::Json(body), _) => Rendered {
            content_type: "application/json".to_string(),
            body: body.clone().into_bytes(),
        },
        (Content::Page { page, .. }, OutputFormat::Html) => {
            Rendered::html(html_document(page, options))
        }
        (Content::Page { page, .. }, OutputFormat::Text) => Rendered::text(text_document(page, options)),
        (Content::Page { .. }, format) => Rendered::json(&page_envelope(outcome, format, options)),
        (Content::Document { content, .. }, OutputFormat::Html) => {
            Rendered::html(wrap_html(&root.final_url, content))
        }
        (Content::Document { content, .. }, OutputFormat::Text) => Rendered::text(content.clone()),
        (Content::Document { content, media_type }, _) => {
            let mut envelope = Map::new();
            envelope.insert("final_url".into(), json!(root.final_url));
            envelope.insert("status_code".into(), json!(root.status_code));
            envelope.insert("content_type".into(), json!(media_type));
            envelope.insert("content".into(), json!(content));
            envelope.insert("fetched_at".into(), json!(timestamp(&root.fetched_at)));
            if options.include_headers {
                envelope.insert("headers".into(), headers_json(&root.headers));
            }
            Rendered::json(&Value::Object(envelope))
        }
    }
}

fn raw_content_type(upstream: &str) -> String {
    if upstream.is_empty() {
        "application/octet-stream".to_string()
    } else {
        upstream.to_string()
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn headers_json(headers: &[(String, String)]) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        // Repeated headers are joined the way HTTP folds them
        let joined = match map.get(name).and_then(Value::as_str) {
            Some(existing) => format!("{}, {}", existing, value),
            None => value.clone(),
        };
        map.insert(name.clone(), Value::String(joined));
    }
    Value::Object(map)
}

fn next_data(metadata: &PageMetadata, filters: &Option<Vec<(String, FilterOutcome)>>) -> Value {
    match filters {
        Some(results) => filters_to_json(results),
        None => metadata.app_state.clone(),
    }
}

fn metadata_envelope(outcome: &ScrapeOutcome) -> Value {
    let (schema, app_state) = match &outcome.content {
        Content::Page {
            metadata, filters, ..
        } => (metadata.schema.clone(), next_data(metadata, filters)),
        _ => (Value::Object(Map::new()), Value::Object(Map::new())),
    };

    json!({
        "final_url": outcome.root.final_url,
        "metadata": schema,
        "nextData": app_state,
    })
}

/// Fields shared by the root envelope and nested fetched pages
fn page_fields(page: &PageResult, format: OutputFormat, options: &RenderOptions) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("title".into(), json!(page.title));
    match format {
        OutputFormat::Json => {
            fields.insert("resumo_html".into(), json!(page.body_html));
        }
        _ => {
            fields.insert(
                "markdown".into(),
                json!(page_markdown(&page.title, &page.url, &page.body_html)),
            );
        }
    }
    if options.include_images {
        fields.insert("images".into(), json!(page.images));
    }
    fields.insert("final_url".into(), json!(page.url));
    fields
}

fn page_envelope(outcome: &ScrapeOutcome, format: OutputFormat, options: &RenderOptions) -> Value {
    let Content::Page {
        page,
        metadata,
        filters,
    } = &outcome.content
    else {
        return Value::Null;
    };
    let root = &outcome.root;

    let mut envelope = page_fields(page, format, options);
    envelope.insert("status_code".into(), json!(root.status_code));
    envelope.insert("links".into(), links_json(&page.links, format, options));
    envelope.insert("metadata".into(), metadata.schema.clone());
    envelope.insert("nextData".into(), next_data(metadata, filters));
    envelope.insert("fetched_at".into(), json!(timestamp(&root.fetched_at)));
    if options.include_headers {
        envelope.insert("headers".into(), headers_json(&root.headers));
    }

    Value::Object(envelope)
}

fn links_json(children: &Children, format: OutputFormat, options: &RenderOptions) -> Value {
    match children {
        Children::Listed(urls) => json!(urls),
        Children::Followed(map) => {
            let mut object = Map::new();
            for (url, outcome) in map.iter() {
                object.insert(url.to_string(), outcome_json(outcome, format, options));
            }
            Value::Object(object)
        }
    }
}

fn outcome_json(outcome: &LinkOutcome, format: OutputFormat, options: &RenderOptions) -> Value {
    let mut fields = Map::new();
    fields.insert("status".into(), json!(outcome.status()));

    match outcome {
        LinkOutcome::Fetched(page) => {
            fields.extend(page_fields(page, format, options));
            fields.insert("links".into(), links_json(&page.links, format, options));
        }
        LinkOutcome::Document {
            content,
            media_type,
        } => {
            fields.insert("content_type".into(), json!(media_type));
            fields.insert("content".into(), json!(content));
        }
        LinkOutcome::Error { message } => {
            fields.insert("error".into(), json!(message));
        }
        LinkOutcome::SkippedDepthLimit
        | LinkOutcome::SkippedBudgetExhausted
        | LinkOutcome::SkippedAlreadyVisited => {}
    }

    Value::Object(fields)
}

fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn wrap_html(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        body
    )
}

fn html_document(page: &PageResult, options: &RenderOptions) -> String {
    let mut body = String::new();
    html_page_section(&mut body, page, options, 1);
    wrap_html(&page.title, &body)
}

fn html_page_section(out: &mut String, page: &PageResult, options: &RenderOptions, level: usize) {
    let heading = level.min(6);
    let _ = writeln!(out, "<h{h}>{}</h{h}>", escape(&page.title), h = heading);
    let _ = writeln!(
        out,
        "<p><a href=\"{url}\">{url}</a></p>",
        url = html_escape::encode_double_quoted_attribute(&page.url)
    );
    out.push_str(&page.body_html);

    if options.include_images && !page.images.is_empty() {
        out.push_str("<ul class=\"images\">\n");
        for image in &page.images {
            let _ = writeln!(
                out,
                "<li><img src=\"{}\"></li>",
                html_escape::encode_double_quoted_attribute(image)
            );
        }
        out.push_str("</ul>\n");
    }

    if page.links.is_empty() {
        return;
    }

    out.push_str("<ul class=\"links\">\n");
    match &page.links {
        Children::Listed(urls) => {
            for url in urls {
                let _ = writeln!(out, "<li>{}</li>", link_anchor(url));
            }
        }
        Children::Followed(map) => {
            for (url, outcome) in map.iter() {
                let _ = write!(out, "<li>{} <em>{}</em>", link_anchor(url), outcome.status());
                match outcome {
                    LinkOutcome::Fetched(child) => {
                        out.push('\n');
                        html_page_section(out, child, options, level + 1);
                    }
                    LinkOutcome::Document { content, .. } => {
                        out.push('\n');
                        out.push_str(content);
                    }
                    LinkOutcome::Error { message } => {
                        let _ = write!(out, ": {}", escape(message));
                    }
                    _ => {}
                }
                out.push_str("</li>\n");
            }
        }
    }
    out.push_str("</ul>\n");
}

fn link_anchor(url: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        html_escape::encode_double_quoted_attribute(url),
        escape(url)
    )
}

fn text_document(page: &PageResult, options: &RenderOptions) -> String {
    let mut out = String::new();
    text_page_section(&mut out, page, options, 0);
    out
}

fn text_page_section(out: &mut String, page: &PageResult, options: &RenderOptions, indent: usize) {
    let pad = "  ".repeat(indent);
    let _ = writeln!(out, "{}{}", pad, page.title);
    let _ = writeln!(out, "{}{}", pad, page.url);
    out.push('\n');

    for line in html_to_text(&page.body_html).lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{}{}", pad, line);
        }
    }

    if options.include_images && !page.images.is_empty() {
        let _ = writeln!(out, "\n{}Images:", pad);
        for image in &page.images {
            let _ = writeln!(out, "{}- {}", pad, image);
        }
    }

    if page.links.is_empty() {
        return;
    }

    let _ = writeln!(out, "\n{}Links:", pad);
    match &page.links {
        Children::Listed(urls) => {
            for url in urls {
                let _ = writeln!(out, "{}- {}", pad, url);
            }
        }
        Children::Followed(map) => {
            for (url, outcome) in map.iter() {
                let _ = writeln!(out, "{}- {} [{}]", pad, url, outcome.status());
                match outcome {
                    LinkOutcome::Fetched(child) => {
                        out.push('\n');
                        text_page_section(out, child, options, indent + 2);
                    }
                    LinkOutcome::Document { content, .. } => {
                        for line in content.lines().filter(|l| !l.trim().is_empty()) {
                            let _ = writeln!(out, "{}    {}", pad, line);
                        }
                    }
                    LinkOutcome::Error { message } => {
                        let _ = writeln!(out, "{}    {}", pad, message);
                    }
                    _ => {}
                }
            }
        }
    }
}
