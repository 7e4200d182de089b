//! Document converters for non-HTML resources
//!
//! PDF, DOCX and XLSX bodies are turned into plain text or into an HTML
//! fragment, depending on the response format the caller asked for.
//!
//! - PDF text comes from `pdf-extract`
//! - DOCX and XLSX are zip containers; their XML parts are scanned for
//!   text runs and cell values

mod docx;
mod pdf;
mod xlsx;

use crate::crawler::ContentKind;
use crate::HarvestError;
use regex::Regex;

pub use docx::docx_paragraphs;
pub use pdf::pdf_text;
pub use xlsx::{xlsx_sheets, Sheet};

/// Shape of converted document content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentForm {
    /// Plain text, paragraphs separated by blank lines
    Text,
    /// `<p>` blocks (and `<table>`s for spreadsheets), text escaped
    HtmlFragment,
}

/// Converts a document body into text or an HTML fragment
///
/// # Arguments
///
/// * `kind` - The classified content kind; must be a document kind
/// * `bytes` - Raw response body
/// * `form` - Output shape
///
/// # Returns
///
/// * `Ok(String)` - Converted content (possibly empty)
/// * `Err(HarvestError::Conversion)` - The body could not be read as `kind`
pub fn convert(kind: ContentKind, bytes: &[u8], form: DocumentForm) -> Result<String, HarvestError> {
    match kind {
        ContentKind::Pdf => {
            let text = pdf_text(bytes)?;
            Ok(render_paragraphs(&split_paragraphs(&text), form))
        }
        ContentKind::Docx => {
            let paragraphs = docx_paragraphs(bytes)?;
            Ok(render_paragraphs(&paragraphs, form))
        }
        ContentKind::Xlsx => {
            let sheets = xlsx_sheets(bytes)?;
            Ok(render_sheets(&sheets, form))
        }
        other => Err(HarvestError::Conversion {
            kind: other.label(),
            message: "not a document format".to_string(),
        }),
    }
}

/// Runs [`convert`] on the blocking thread pool
///
/// A converter that panics on a malformed body yields a conversion error
/// instead of taking the request down with it.
pub async fn convert_blocking(
    kind: ContentKind,
    bytes: Vec<u8>,
    form: DocumentForm,
) -> Result<String, HarvestError> {
    tokio::task::spawn_blocking(move || convert(kind, &bytes, form))
        .await
        .map_err(|e| HarvestError::Conversion {
            kind: kind.label(),
            message: format!("converter aborted: {}", e),
        })?
}

/// Splits extracted text into paragraphs on blank lines
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
}

fn render_paragraphs(paragraphs: &[String], form: DocumentForm) -> String {
    let non_empty = paragraphs.iter().map(|p| p.trim()).filter(|p| !p.is_empty());

    match form {
        DocumentForm::Text => non_empty.collect::<Vec<_>>().join("\n\n"),
        DocumentForm::HtmlFragment => non_empty
            .map(|p| format!("<p>{}</p>\n", html_escape::encode_text(p)))
            .collect(),
    }
}

fn render_sheets(sheets: &[Sheet], form: DocumentForm) -> String {
    let mut out = String::new();

    for sheet in sheets {
        match form {
            DocumentForm::Text => {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("## {}\n", sheet.name));
                for row in &sheet.rows {
                    out.push_str(&row.join("\t"));
                    out.push('\n');
                }
            }
            DocumentForm::HtmlFragment => {
                out.push_str(&format!("<h3>{}</h3>\n<table>\n", html_escape::encode_text(&sheet.name)));
                for row in &sheet.rows {
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str(&format!("<td>{}</td>", html_escape::encode_text(cell)));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</table>\n");
            }
        }
    }

    out
}

/// Compiles one of the fixed XML scanning patterns
fn pattern(re: &str) -> Result<Regex, HarvestError> {
    Regex::new(re).map_err(|e| HarvestError::Internal(format!("bad pattern {}: {}", re, e)))
}

/// Decodes XML character references in a text run
fn decode_xml_text(raw: &str) -> String {
    html_escape::decode_html_entities(raw).into_owned()
}

fn zip_error(kind: &'static str, error: zip::result::ZipError) -> HarvestError {
    HarvestError::Conversion {
        kind,
        message: error.to_string(),
    }
}

/// Reads one named entry of a zip container into a string
fn read_zip_entry<R: std::io::Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
    kind: &'static str,
) -> Result<String, HarvestError> {
    use std::io::Read;

    let mut entry = archive.by_name(name).map_err(|e| zip_error(kind, e))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| HarvestError::Conversion {
            kind,
            message: format!("{}: {}", name, e),
        })?;
    Ok(content)
}
