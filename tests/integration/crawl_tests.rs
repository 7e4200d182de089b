//! Recursive crawl behaviour against mock servers

use crate::{docx_bytes, html_page, pdf_bytes, test_scraper};
use page_harvest::config::CrawlDefaults;
use page_harvest::crawler::{Children, LinkMap};
use page_harvest::output::Content;
use page_harvest::{LinkOutcome, PageResult, ScrapeRequest};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Runs a scrape of `body` and returns the root page
async fn crawl(body: Value) -> PageResult {
    let request =
        ScrapeRequest::from_value(&body, &CrawlDefaults::default()).expect("Invalid request");
    let outcome = test_scraper()
        .collect(&request)
        .await
        .expect("Scrape failed");

    match outcome.content {
        Content::Page { page, .. } => page,
        other => panic!("Expected an HTML page, got {:?}", other),
    }
}

fn followed(page: &PageResult) -> &LinkMap {
    match &page.links {
        Children::Followed(map) => map,
        Children::Listed(_) => panic!("Expected followed children for {}", page.url),
    }
}

fn fetched<'a>(map: &'a LinkMap, url: &str) -> &'a PageResult {
    match map.get(url) {
        Some(LinkOutcome::Fetched(page)) => page,
        other => panic!("Expected {} to be fetched, got {:?}", url, other),
    }
}

#[tokio::test]
async fn test_link_budget_limits_recursive_fetches() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("A", "<p>Page A</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    for skipped in ["/b", "/c"] {
        Mock::given(method("GET"))
            .and(path(skipped))
            .respond_with(html_page("Skipped", ""))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    let page = crawl(json!({
        "url": base_url,
        "max_level": 1,
        "max_recursion_links": 1,
        "rate_limit": 0
    }))
    .await;

    let map = followed(&page);
    assert_eq!(map.len(), 3);
    assert_eq!(fetched(map, &format!("{}/a", base_url)).title, "A");
    assert_eq!(
        map.get(&format!("{}/b", base_url)),
        Some(&LinkOutcome::SkippedBudgetExhausted)
    );
    assert_eq!(
        map.get(&format!("{}/c", base_url)),
        Some(&LinkOutcome::SkippedBudgetExhausted)
    );
}

#[tokio::test]
async fn test_cycles_are_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", r#"<p>Root</p><a href="/a">A</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page(
            "A",
            r#"<p>Page A</p><a href="/">Home</a><a href="/a/">Self</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({
        "url": base_url,
        "max_level": 5,
        "rate_limit": 0
    }))
    .await;

    let child = fetched(followed(&page), &format!("{}/a", base_url));
    let grandchildren = followed(child);

    assert_eq!(
        grandchildren.get(&format!("{}/", base_url)),
        Some(&LinkOutcome::SkippedAlreadyVisited)
    );
    assert_eq!(
        grandchildren.get(&format!("{}/a/", base_url)),
        Some(&LinkOutcome::SkippedAlreadyVisited)
    );
}

#[tokio::test]
async fn test_depth_zero_lists_links_without_fetching() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/a">A</a><a href="/a#top">A again</a><a href="mailto:x@example.com">Mail</a><a href="https://other.example/b">B</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("A", ""))
        .expect(0)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({ "url": base_url })).await;

    assert_eq!(
        page.links,
        Children::Listed(vec![
            format!("{}/a", base_url),
            "https://other.example/b".to_string()
        ])
    );
}

#[tokio::test]
async fn test_depth_limit_marks_deeper_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", r#"<a href="/a">A</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("A", r#"<a href="/b">B</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("B", ""))
        .expect(0)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({ "url": base_url, "max_level": 1, "rate_limit": 0 })).await;

    let child = fetched(followed(&page), &format!("{}/a", base_url));
    assert_eq!(child.body_html, page_harvest::crawler::NO_TEXT_PLACEHOLDER);
    assert_eq!(
        followed(child).get(&format!("{}/b", base_url)),
        Some(&LinkOutcome::SkippedDepthLimit)
    );
}

#[tokio::test]
async fn test_link_filter_applies_at_every_depth() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/keep/1">Keep</a><a href="/drop/1">Drop</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/keep/1"))
        .respond_with(html_page(
            "Keep 1",
            r#"<a href="/keep/2">Keep</a><a href="/drop/2">Drop</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/keep/2"))
        .respond_with(html_page("Keep 2", "<p>Deep</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({
        "url": base_url,
        "max_level": 2,
        "link_exp_filter": "/keep/",
        "rate_limit": 0
    }))
    .await;

    let map = followed(&page);
    assert_eq!(map.len(), 1);
    let child = fetched(map, &format!("{}/keep/1", base_url));

    let grandchildren = followed(child);
    assert_eq!(grandchildren.len(), 1);
    assert_eq!(
        fetched(grandchildren, &format!("{}/keep/2", base_url)).body_html,
        "<p>Deep</p>\n"
    );
}

#[tokio::test]
async fn test_documents_errors_and_unsupported_types() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/report.docx">Report</a>
               <a href="/broken.docx">Broken</a>
               <a href="/data.json">Data</a>
               <a href="http://127.0.0.1:1/unreachable">Down</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/report.docx"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(docx_bytes(&["Hello world", "Second paragraph"]))
                .insert_header(
                    "content-type",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                ),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken.docx"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"definitely not a zip".to_vec())
                .insert_header("content-type", "application/msword"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({ "url": base_url, "max_level": 1, "rate_limit": 0 })).await;
    let map = followed(&page);

    match map.get(&format!("{}/report.docx", base_url)) {
        Some(LinkOutcome::Document {
            content,
            media_type,
        }) => {
            assert_eq!(content, "Hello world\n\nSecond paragraph");
            assert!(media_type.contains("wordprocessingml"));
        }
        other => panic!("Expected a converted document, got {:?}", other),
    }

    match map.get(&format!("{}/broken.docx", base_url)) {
        Some(LinkOutcome::Error { message }) => assert!(message.contains("docx")),
        other => panic!("Expected a conversion error, got {:?}", other),
    }

    assert!(map.get(&format!("{}/data.json", base_url)).is_none());

    match map.get("http://127.0.0.1:1/unreachable") {
        Some(LinkOutcome::Error { .. }) => {}
        other => panic!("Expected a fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_target_counts_as_visited() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/old">Old</a><a href="/new">New</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html_page("New", "<p>Moved here</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({ "url": base_url, "max_level": 1, "rate_limit": 0 })).await;
    let map = followed(&page);

    let moved = fetched(map, &format!("{}/old", base_url));
    assert_eq!(moved.url, format!("{}/new", base_url));
    assert_eq!(
        map.get(&format!("{}/new", base_url)),
        Some(&LinkOutcome::SkippedAlreadyVisited)
    );
}

#[tokio::test]
async fn test_redirect_back_to_visited_page_is_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/loop">Loop</a><a href="/x">X</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html_page("X", "<p>Page X</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({ "url": base_url, "max_level": 3, "rate_limit": 0 })).await;
    let map = followed(&page);

    assert_eq!(
        map.get(&format!("{}/loop", base_url)),
        Some(&LinkOutcome::SkippedAlreadyVisited)
    );
    assert_eq!(fetched(map, &format!("{}/x", base_url)).title, "X");
}

#[tokio::test]
async fn test_trailing_slash_redirect_is_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", r#"<a href="/docs">Docs</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html_page("Docs", "<p>Index</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({ "url": base_url, "max_level": 1, "rate_limit": 0 })).await;

    let docs = fetched(followed(&page), &format!("{}/docs", base_url));
    assert_eq!(docs.title, "Docs");
    assert_eq!(docs.url, format!("{}/docs/", base_url));
}

#[tokio::test]
async fn test_followed_pdf_becomes_document() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", r#"<a href="/paper.pdf">Paper</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/paper.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(pdf_bytes("Hello PDF"))
                .insert_header("content-type", "application/pdf"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = crawl(json!({ "url": base_url, "max_level": 1, "rate_limit": 0 })).await;

    match followed(&page).get(&format!("{}/paper.pdf", base_url)) {
        Some(LinkOutcome::Document {
            content,
            media_type,
        }) => {
            assert!(content.contains("Hello PDF"), "unexpected text: {:?}", content);
            assert_eq!(media_type, "application/pdf");
        }
        other => panic!("Expected a converted PDF, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recursive_fetches_are_paced() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", r#"<a href="/a">A</a><a href="/b">B</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(html_page("Child", "<p>Child</p>"))
        .mount(&mock_server)
        .await;

    let start = Instant::now();
    let page = crawl(json!({ "url": base_url, "max_level": 1, "rate_limit": 0.2 })).await;

    assert_eq!(followed(&page).len(), 2);
    assert!(start.elapsed() >= Duration::from_millis(400));
}
