//! Result tree produced by a crawl

use std::collections::hash_map::{Entry, HashMap};

/// Extracted content of one HTML page
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// URL the page was extracted from (after redirects)
    pub url: String,

    /// Page title, or a placeholder when the page has none
    pub title: String,

    /// Paragraph text as `<p>` blocks, or a placeholder when empty
    pub body_html: String,

    /// Absolute image URLs
    pub images: Vec<String>,

    /// Links found on the page
    pub links: Children,
}

/// Links of a page, shaped by whether recursion is enabled
#[derive(Debug, Clone, PartialEq)]
pub enum Children {
    /// Recursion disabled: deduplicated absolute URLs in document order
    Listed(Vec<String>),

    /// Recursion enabled: one outcome per qualifying link
    Followed(LinkMap),
}

impl Children {
    /// Number of links held, whatever the mode
    pub fn len(&self) -> usize {
        match self {
            Self::Listed(urls) => urls.len(),
            Self::Followed(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Link URLs in order, whatever the mode
    pub fn urls(&self) -> Vec<&str> {
        match self {
            Self::Listed(urls) => urls.iter().map(String::as_str).collect(),
            Self::Followed(map) => map.iter().map(|(url, _)| url).collect(),
        }
    }
}

/// The result of attempting to follow one link
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// An HTML page that was fetched and extracted
    Fetched(PageResult),

    /// A PDF/DOCX/XLSX document converted to text or an HTML fragment
    Document { content: String, media_type: String },

    /// The link sits at the maximum depth
    SkippedDepthLimit,

    /// The link budget was spent before reaching this link
    SkippedBudgetExhausted,

    /// The URL was already fetched or claimed in this crawl
    SkippedAlreadyVisited,

    /// The fetch or conversion failed
    Error { message: String },
}

impl LinkOutcome {
    /// Stable snake_case name of the variant
    pub fn status(&self) -> &'static str {
        match self {
            Self::Fetched(_) => "fetched",
            Self::Document { .. } => "document",
            Self::SkippedDepthLimit => "skipped_depth_limit",
            Self::SkippedBudgetExhausted => "skipped_budget_exhausted",
            Self::SkippedAlreadyVisited => "skipped_already_visited",
            Self::Error { .. } => "error",
        }
    }
}

/// Ordered mapping from link URL to outcome
///
/// Keeps insertion (discovery) order; a key is inserted at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMap {
    entries: Vec<(String, LinkOutcome)>,
    /// Position of each key in `entries`
    index: HashMap<String, usize>,
}

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an outcome unless the key is already present
    ///
    /// Returns false when the key was already there.
    pub fn insert(&mut self, url: String, outcome: LinkOutcome) -> bool {
        match self.index.entry(url) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                self.entries.push((slot.key().clone(), outcome));
                slot.insert(self.entries.len() - 1);
                true
            }
        }
    }

    pub fn get(&self, url: &str) -> Option<&LinkOutcome> {
        let position = *self.index.get(url)?;
        self.entries.get(position).map(|(_, outcome)| outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LinkOutcome)> {
        self.entries.iter().map(|(url, outcome)| (url.as_str(), outcome))
    }
}
