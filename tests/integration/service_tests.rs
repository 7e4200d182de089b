//! Request handling, rendering and the HTTP surface

use crate::{html_page, test_scraper};
use page_harvest::service::server;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("Response body is not JSON")
}

#[tokio::test]
async fn test_default_markdown_response() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let images: String = (0..8)
        .map(|i| format!(r#"<img src="/img/{}.png">"#, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            &format!(
                r#"<p>Hello <b>world</b></p>{}<script type="application/ld+json">{{"@type": "WebSite"}}</script>"#,
                images
            ),
        ))
        .mount(&mock_server)
        .await;

    let response = test_scraper()
        .handle("POST", json!({ "url": base_url }).to_string().as_bytes())
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert_eq!(response.header("content-type"), Some("application/json"));

    let body = body_json(&response.body);
    let markdown = body["markdown"].as_str().unwrap();
    assert!(markdown.starts_with(&format!(
        "# Home\n\nFinal URL: [Link]({}/)\n\n",
        base_url
    )));
    assert!(markdown.contains("Hello"));
    assert_eq!(body["images"].as_array().unwrap().len(), 5);
    assert_eq!(body["status_code"], 200);
    assert_eq!(body["metadata"]["@type"], "WebSite");
    assert_eq!(body["nextData"], json!({}));
}

#[tokio::test]
async fn test_caller_headers_reach_every_fetch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("x-token", "secret"))
        .respond_with(html_page("Home", r#"<a href="/a">A</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .and(header("x-token", "secret"))
        .respond_with(html_page("A", "<p>Child</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = json!({
        "url": base_url,
        "headers": [{"X-Token": "secret"}],
        "max_level": 1,
        "rate_limit": 0,
        "format": "json"
    });
    let response = test_scraper()
        .handle("POST", request.to_string().as_bytes())
        .await;

    assert_eq!(response.status, 200);
    let body = body_json(&response.body);
    let child = &body["links"][format!("{}/a", base_url)];
    assert_eq!(child["status"], "fetched");
    assert_eq!(child["resumo_html"], "<p>Child</p>\n");
}

#[tokio::test]
async fn test_json_root_is_pretty_printed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"a":1}"#, "application/json"))
        .mount(&mock_server)
        .await;

    let request = json!({ "url": format!("{}/api", mock_server.uri()) });
    let response = test_scraper()
        .handle("POST", request.to_string().as_bytes())
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), "{\n  \"a\": 1\n}");
}

#[tokio::test]
async fn test_proxy_returns_upstream_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<p>raw</p>"))
        .mount(&mock_server)
        .await;

    let request = json!({ "url": mock_server.uri(), "format": "proxy" });
    let response = test_scraper()
        .handle("POST", request.to_string().as_bytes())
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert_eq!(
        response.body_text(),
        "<html><head><title>Home</title></head><body><p>raw</p></body></html>"
    );
}

#[tokio::test]
async fn test_metadata_filters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<script id="__NEXT_DATA__" type="application/json">{"props": {"items": [{"id": 1}, {"id": 2}]}}</script>"#,
        ))
        .mount(&mock_server)
        .await;

    let request = json!({
        "url": mock_server.uri(),
        "format": "metadata",
        "metadata_filters": ["$.props.items[*].id", "$["]
    });
    let response = test_scraper()
        .handle("POST", request.to_string().as_bytes())
        .await;

    assert_eq!(response.status, 200);
    let body = body_json(&response.body);
    assert_eq!(body["final_url"], format!("{}/", mock_server.uri()));
    assert_eq!(body["nextData"]["$.props.items[*].id"]["matches"], json!([1, 2]));
    assert!(body["nextData"]["$["]["error"].is_string());
}

#[tokio::test]
async fn test_non_success_root_is_still_processed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw(
                "<html><head><title>Not Found</title></head><body><p>Nothing here</p></body></html>",
                "text/html",
            ),
        )
        .mount(&mock_server)
        .await;

    let request = json!({ "url": format!("{}/gone", mock_server.uri()), "format": "text" });
    let response = test_scraper()
        .handle("POST", request.to_string().as_bytes())
        .await;

    assert_eq!(response.status, 200);
    let text = response.body_text();
    assert!(text.starts_with("Not Found\n"));
    assert!(text.contains("Nothing here"));
}

#[tokio::test]
async fn test_validation_errors() {
    let scraper = test_scraper();

    for body in [
        json!({ "url": "example.com", "headers": "invalid" }).to_string(),
        json!({}).to_string(),
        json!({ "url": "example.com", "format": "pdf" }).to_string(),
        json!({ "url": "example.com", "link_exp_filter": "[" }).to_string(),
        "{not json".to_string(),
        String::new(),
    ] {
        let response = scraper.handle("POST", body.as_bytes()).await;
        assert_eq!(response.status, 400, "body {:?}", body);
        assert!(body_json(&response.body)["error"].is_string());
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }
}

#[tokio::test]
async fn test_root_fetch_failure_is_500() {
    let request = json!({ "url": "http://127.0.0.1:1/" });
    let response = test_scraper()
        .handle("POST", request.to_string().as_bytes())
        .await;

    assert_eq!(response.status, 500);
    assert!(body_json(&response.body)["error"].is_string());
}

#[tokio::test]
async fn test_missing_scheme_defaults_to_https() {
    let mock_server = MockServer::start().await;
    let host = mock_server.uri().trim_start_matches("http://").to_string();

    // The mock server only speaks plain HTTP, so an https fetch must fail
    let response = test_scraper()
        .handle("POST", json!({ "url": host }).to_string().as_bytes())
        .await;

    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn test_http_surface() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<p>Served</p>"))
        .mount(&mock_server)
        .await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(server::serve(listener, test_scraper()));

    let client = reqwest::Client::new();

    let health = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .expect("Health request failed");
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "ok");

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("http://{}/scrape", addr))
        .header("origin", "https://app.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .expect("Preflight request failed");
    assert_eq!(preflight.status(), 200);
    assert_eq!(preflight.headers()["access-control-allow-origin"], "*");
    let allowed_methods = preflight.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(allowed_methods.contains("POST"));
    assert!(allowed_methods.contains("OPTIONS"));
    let allowed_headers = preflight.headers()["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed_headers.contains("content-type"));
    assert!(allowed_headers.contains("authorization"));
    assert!(preflight.text().await.unwrap().is_empty());

    let scrape = client
        .post(format!("http://{}/scrape", addr))
        .header("content-type", "application/json")
        .body(json!({ "url": mock_server.uri(), "format": "text" }).to_string())
        .send()
        .await
        .expect("Scrape request failed");
    assert_eq!(scrape.status(), 200);
    assert_eq!(scrape.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        scrape
            .headers()
            .get_all("access-control-allow-origin")
            .iter()
            .count(),
        1
    );
    assert!(scrape.text().await.unwrap().contains("Served"));

    let rejected = client
        .post(format!("http://{}/", addr))
        .body("{}")
        .send()
        .await
        .expect("Root request failed");
    assert_eq!(rejected.status(), 400);
}
