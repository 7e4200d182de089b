//! Output module for shaping scrape results into response payloads
//!
//! This module handles:
//! - The set of supported response formats
//! - Markdown and plain-text rendering of extracted content
//! - Projecting the canonical result tree onto each format
//!
//! Rendering is a pure function of the result; nothing here performs I/O.

mod format;
mod markdown;

pub use format::{render, Content, RenderOptions, Rendered, RootInfo, ScrapeOutcome};
pub use markdown::{html_to_text, page_markdown};

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Response format selected by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Full structured JSON with the raw body HTML (`resumo_html`)
    Json,
    /// A standalone HTML document
    Html,
    /// Plain text
    Text,
    /// Structured JSON with a markdown rendering of the body
    #[default]
    Markdown,
    /// The upstream body, untouched
    Proxy,
    /// Only the embedded metadata
    Metadata,
}

impl OutputFormat {
    /// Returns true when document content should be an HTML fragment
    pub fn is_html(&self) -> bool {
        matches!(self, Self::Html)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Proxy => "proxy",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "text" => Ok(Self::Text),
            "markdown" => Ok(Self::Markdown),
            "proxy" => Ok(Self::Proxy),
            "metadata" => Ok(Self::Metadata),
            other => Err(format!(
                "unknown format '{}', expected one of json, html, text, markdown, proxy, metadata",
                other
            )),
        }
    }
}
