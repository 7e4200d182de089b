//! Content-type classification
//!
//! Maps a `Content-Type` header value to the handler that should process
//! the body.

/// The kind of resource a response body holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    Pdf,
    Docx,
    Xlsx,
    Json,
    Other,
}

impl ContentKind {
    /// Returns true for the binary document formats handled by a converter
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Pdf | Self::Docx | Self::Xlsx)
    }

    /// Canonical media type reported for converted documents
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Json => "application/json",
            Self::Other => "application/octet-stream",
        }
    }

    /// Short lowercase name used in logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Json => "json",
            Self::Other => "other",
        }
    }
}

/// Classifies a `Content-Type` header value
///
/// Matching is a case-insensitive substring test, so parameters such as
/// `; charset=utf-8` don't matter.
///
/// # Examples
///
/// ```
/// use page_harvest::crawler::{classify, ContentKind};
///
/// assert_eq!(classify("text/html; charset=UTF-8"), ContentKind::Html);
/// assert_eq!(classify("Application/PDF"), ContentKind::Pdf);
/// assert_eq!(classify("image/png"), ContentKind::Other);
/// ```
pub fn classify(content_type: &str) -> ContentKind {
    let ct = content_type.to_ascii_lowercase();

    if ct.contains("text/html") || ct.contains("application/xhtml") {
        ContentKind::Html
    } else if ct.contains("application/pdf") {
        ContentKind::Pdf
    } else if ct.contains("wordprocessingml") || ct.contains("application/msword") {
        ContentKind::Docx
    } else if ct.contains("spreadsheetml") || ct.contains("application/vnd.ms-excel") {
        ContentKind::Xlsx
    } else if ct.contains("json") {
        ContentKind::Json
    } else {
        ContentKind::Other
    }
}
