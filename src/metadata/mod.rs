//! Structured metadata embedded in HTML pages
//!
//! Two sources are read:
//! - `<script type="application/ld+json">` blocks (schema.org data)
//! - the `<script id="__NEXT_DATA__">` application state blob
//!
//! Callers can then narrow the application state down with JSONPath
//! queries, see [`apply_filters`].

mod filter;

pub use filter::{apply_filters, filters_to_json, FilterOutcome};

use scraper::{Html, Selector};
use serde_json::{Map, Value};

/// Metadata extracted from one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetadata {
    /// The single JSON-LD object, an array when there are several, `{}` when none
    pub schema: Value,

    /// Parsed `__NEXT_DATA__` content, `{}` when absent or unparseable
    pub app_state: Value,
}

impl Default for PageMetadata {
    fn default() -> Self {
        Self {
            schema: Value::Object(Map::new()),
            app_state: Value::Object(Map::new()),
        }
    }
}

/// Extracts JSON-LD and embedded application state from a page
///
/// Blocks that are not valid JSON are skipped.
///
/// # Example
///
/// ```
/// use page_harvest::metadata::extract_metadata;
///
/// let html = r#"<script type="application/ld+json">{"@type": "Article"}</script>"#;
/// let metadata = extract_metadata(html);
/// assert_eq!(metadata.schema["@type"], "Article");
/// ```
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    PageMetadata {
        schema: extract_json_ld(&document),
        app_state: extract_app_state(&document),
    }
}

fn extract_json_ld(document: &Html) -> Value {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Value::Object(Map::new());
    };

    let mut blocks: Vec<Value> = document
        .select(&selector)
        .filter_map(|element| {
            let text = element.text().collect::<String>();
            match serde_json::from_str::<Value>(text.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Skipping unparseable JSON-LD block: {}", e);
                    None
                }
            }
        })
        .collect();

    match blocks.len() {
        0 => Value::Object(Map::new()),
        1 => blocks.remove(0),
        _ => Value::Array(blocks),
    }
}

fn extract_app_state(document: &Html) -> Value {
    let Ok(selector) = Selector::parse("script#__NEXT_DATA__") else {
        return Value::Object(Map::new());
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| {
            let text = element.text().collect::<String>();
            serde_json::from_str::<Value>(text.trim())
                .map_err(|e| tracing::debug!("Skipping unparseable __NEXT_DATA__: {}", e))
                .ok()
        })
        .unwrap_or_else(|| Value::Object(Map::new()))
}
