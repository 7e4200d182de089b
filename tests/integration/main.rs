//! Integration tests for Page-Harvest
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! scrape pipeline end-to-end: root fetch, recursive crawl, document
//! conversion, rendering and the HTTP surface.

mod crawl_tests;
mod service_tests;

use page_harvest::config::Config;
use page_harvest::crawler::build_http_client;
use page_harvest::Scraper;
use std::io::{Cursor, Write};
use wiremock::ResponseTemplate;

/// Creates a scraper with default configuration
pub fn test_scraper() -> Scraper {
    let config = Config::default();
    let client = build_http_client(&config.user_agent, &config.fetcher)
        .expect("Failed to build HTTP client");
    Scraper::with_client(client, config)
}

/// An HTML page with the given title and body markup
pub fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        )
        .into_bytes(),
        "text/html",
    )
}

/// A minimal DOCX container with one paragraph per entry of `paragraphs`
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .expect("Failed to start zip entry");
    writer
        .write_all(xml.as_bytes())
        .expect("Failed to write zip entry");
    writer.finish().expect("Failed to finish zip").into_inner()
}

/// A single-page PDF whose text layer shows `text` in Helvetica
pub fn pdf_bytes(text: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 72 712 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        trailer.push_str(&format!("{:010} 00000 n \n", offset));
    }
    trailer.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));
    pdf.extend_from_slice(trailer.as_bytes());
    pdf
}
