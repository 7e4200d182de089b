//! HTTP surface for the scrape service

use crate::service::{ScrapeResponse, Scraper, CORS_HEADERS};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the router: any method on `/` and `/scrape`, `GET /health`
///
/// CORS is handled by the layer, which also answers every `OPTIONS`
/// request before it reaches the scrape handler.
pub fn router(scraper: Scraper) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/", any(scrape_handler))
        .route("/scrape", any(scrape_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(scraper)
}

/// Serves the router on an already-bound listener until the process exits
pub async fn serve(listener: TcpListener, scraper: Scraper) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(scraper)).await
}

async fn scrape_handler(
    State(scraper): State<Scraper>,
    method: Method,
    body: Bytes,
) -> ScrapeResponse {
    scraper.handle(method.as_str(), &body).await
}

async fn health_handler() -> &'static str {
    "ok"
}

impl IntoResponse for ScrapeResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let has_content_type = self.header("content-type").is_some();
        let mut response = (status, self.body).into_response();

        let headers = response.headers_mut();
        if !has_content_type {
            headers.remove(CONTENT_TYPE);
        }
        // The CORS layer owns the access-control headers
        for (name, value) in self
            .headers
            .iter()
            .filter(|(name, _)| !is_cors_header(name))
        {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!("Dropping unrepresentable response header '{}'", name),
            }
        }

        response
    }
}

fn is_cors_header(name: &str) -> bool {
    CORS_HEADERS
        .iter()
        .any(|(cors, _)| cors.eq_ignore_ascii_case(name))
}
