use crate::url::visit_key;
use std::collections::HashSet;
use url::Url;

/// Mutable state shared by every level of one recursive crawl
#[derive(Debug, Default)]
pub struct CrawlState {
    /// Normalized URLs already fetched or claimed for fetching
    visited: HashSet<String>,

    /// Number of recursive fetches issued so far
    links_followed: usize,

    /// Upper bound for `links_followed`; None means unbounded
    max_links: Option<usize>,
}

impl CrawlState {
    /// Creates the state for a new top-level crawl
    pub fn new(max_links: Option<usize>) -> Self {
        Self {
            visited: HashSet::new(),
            links_followed: 0,
            max_links,
        }
    }

    /// Claims a URL for fetching
    ///
    /// Returns true if the URL was not yet visited. The check and the insert
    /// are a single operation so a URL can only ever be claimed once.
    pub fn claim(&mut self, url: &Url) -> bool {
        self.visited.insert(visit_key(url))
    }

    /// Returns true if the URL has already been claimed
    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(&visit_key(url))
    }

    /// Returns true once the link budget is spent
    pub fn budget_exhausted(&self) -> bool {
        self.max_links
            .map_or(false, |max| self.links_followed >= max)
    }

    /// Consumes one unit of the link budget
    ///
    /// Returns false without counting when the budget is already spent.
    pub fn record_follow(&mut self) -> bool {
        if self.budget_exhausted() {
            return false;
        }
        self.links_followed += 1;
        true
    }

    /// Number of recursive fetches issued so far
    pub fn links_followed(&self) -> usize {
        self.links_followed
    }

    /// Number of distinct URLs claimed so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
