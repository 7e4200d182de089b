use super::{decode_xml_text, pattern, read_zip_entry, zip_error};
use crate::HarvestError;
use std::io::Cursor;

const DOCUMENT_PART: &str = "word/document.xml";

/// Reads the paragraphs of a DOCX document, in order
///
/// Each `<w:p>` becomes one entry built from its `<w:t>` runs; `<w:tab/>`
/// and `<w:br/>` become a tab and a newline.
pub fn docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>, HarvestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| zip_error("docx", e))?;
    let xml = read_zip_entry(&mut archive, DOCUMENT_PART, "docx")?;
    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>, HarvestError> {
    let paragraph_re = pattern(r"(?s)<w:p[\s>].*?</w:p>")?;
    let run_re = pattern(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:br\s*/>")?;

    let mut paragraphs = Vec::new();
    for paragraph in paragraph_re.find_iter(xml) {
        let mut text = String::new();
        for run in run_re.captures_iter(paragraph.as_str()) {
            match run.get(1) {
                Some(t) => text.push_str(&decode_xml_text(t.as_str())),
                None if run[0].starts_with("<w:tab") => text.push('\t'),
                None => text.push('\n'),
            }
        }
        paragraphs.push(text);
    }

    Ok(paragraphs)
}
