use crate::HarvestError;

/// Extracts the embedded text layer of a PDF
///
/// Scanned PDFs without a text layer yield an empty string.
pub fn pdf_text(bytes: &[u8]) -> Result<String, HarvestError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| HarvestError::Conversion {
        kind: "pdf",
        message: e.to_string(),
    })
}
