use crate::UrlError;
use regex::Regex;

/// Link-inclusion filter applied to every discovered link
///
/// A link is kept when the pattern matches anywhere in its absolute form.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    regex: Regex,
}

impl LinkFilter {
    /// Compiles a filter from a regular expression
    ///
    /// # Examples
    ///
    /// ```
    /// use page_harvest::url::LinkFilter;
    ///
    /// let filter = LinkFilter::new(r"/docs/").unwrap();
    /// assert!(filter.matches("https://example.com/docs/intro"));
    /// assert!(!filter.matches("https://example.com/blog/post"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self, UrlError> {
        let regex = Regex::new(pattern).map_err(|e| UrlError::InvalidFilter(e.to_string()))?;
        Ok(Self { regex })
    }

    /// Returns true if the link should be kept
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    /// The pattern this filter was built from
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
