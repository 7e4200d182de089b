//! Markdown and plain-text rendering
//!
//! Body HTML produced by the extractor is a flat run of `<p>` blocks, so
//! both renderings are short.

use scraper::{Html, Selector};

/// Renders a page as markdown with a title heading and a link to its URL
///
/// # Example
///
/// ```
/// use page_harvest::output::page_markdown;
///
/// let md = page_markdown("Home", "https://example.com/", "<p>Hello</p>");
/// assert!(md.starts_with("# Home\n\nFinal URL: [Link](https://example.com/)\n\n"));
/// assert!(md.contains("Hello"));
/// ```
pub fn page_markdown(title: &str, final_url: &str, body_html: &str) -> String {
    format!(
        "# {}\n\nFinal URL: [Link]({})\n\n{}\n",
        title,
        final_url,
        html_to_markdown(body_html).trim_end()
    )
}

/// Converts an HTML fragment to markdown, falling back to plain text
fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|e| {
        tracing::debug!("Markdown conversion failed, using plain text: {}", e);
        html_to_text(html)
    })
}

/// Converts an HTML fragment to plain text
///
/// Each `<p>` becomes one paragraph separated by a blank line; fragments
/// without paragraphs yield their whole text content.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    let paragraphs: Vec<String> = match Selector::parse("p") {
        Ok(selector) => fragment
            .select(&selector)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    if paragraphs.is_empty() {
        fragment.root_element().text().collect::<String>().trim().to_string()
    } else {
        paragraphs.join("\n\n")
    }
}
