//! HTML parser for extracting page content and links
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - Paragraph text, bounded by a byte budget
//! - Image URLs, bounded by a count
//! - Link targets, resolved to absolute URLs in document order

use crate::url::resolve_link;
use scraper::{Html, Selector};
use url::Url;

/// Early-exit limits for extraction
#[derive(Debug, Clone, Copy)]
pub struct ExtractionLimits {
    /// Stop collecting paragraphs once the body HTML exceeds this many bytes
    pub max_content_size: usize,

    /// Stop collecting images once this many have been found
    pub max_images: usize,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Paragraph text re-wrapped as `<p>` blocks, empty when none found
    pub body_html: String,

    /// Absolute image URLs, deduplicated
    pub images: Vec<String>,

    /// Absolute link targets from `<a href>`, in document order
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts content and links
///
/// # Extraction Rules
///
/// - Each `<p>` with non-empty trimmed text becomes one `<p>` block. The
///   text is HTML-escaped. Scanning stops as soon as the accumulated body
///   passes `max_content_size`.
/// - `<img src>` values are resolved against `base_url`; duplicates are
///   skipped and scanning stops at `max_images`.
/// - `<a href>` targets go through [`resolve_link`]; duplicates are kept
///   here and collapsed by the caller.
///
/// # Example
///
/// ```
/// use page_harvest::crawler::{parse_html, ExtractionLimits};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>Hi</p><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let limits = ExtractionLimits { max_content_size: 1024, max_images: 5 };
/// let parsed = parse_html(html, &base_url, &limits);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.body_html, "<p>Hi</p>\n");
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url, limits: &ExtractionLimits) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        body_html: extract_paragraphs(&document, limits.max_content_size),
        images: extract_images(&document, base_url, limits.max_images),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_paragraphs(document: &Html, max_content_size: usize) -> String {
    let mut body = String::new();

    let Ok(p_selector) = Selector::parse("p") else {
        return body;
    };

    for element in document.select(&p_selector) {
        let text = element.text().collect::<String>();
        let text = text.trim();
        if !text.is_empty() {
            body.push_str("<p>");
            body.push_str(&html_escape::encode_text(text));
            body.push_str("</p>\n");
        }
        if body.len() > max_content_size {
            break;
        }
    }

    body
}

fn extract_images(document: &Html, base_url: &Url, max_images: usize) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    if max_images == 0 {
        return images;
    }

    let Ok(img_selector) = Selector::parse("img[src]") else {
        return images;
    };

    for element in document.select(&img_selector) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let src = src.trim();
        if src.is_empty() {
            continue;
        }

        if let Ok(absolute) = base_url.join(src) {
            let absolute = absolute.to_string();
            if !images.contains(&absolute) {
                images.push(absolute);
            }
        }

        if images.len() >= max_images {
            break;
        }
    }

    images
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}
