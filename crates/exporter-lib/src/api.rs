//! HTTP API: scrape endpoints, the exporter's own metrics and an index page

use crate::observability::ExporterMetrics;
use crate::scrape::{parse_scrape_timeout, Scraper, SCRAPE_TIMEOUT_HEADER};
use crate::selector::ScrapeTarget;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

const INDEX_PAGE: &str = r#"<html>
    <head><title>Kube Summary Exporter</title></head>
    <body>
        <h1>Kube Summary Exporter</h1>
        <p><a href="/nodes">Retrieve metrics for all nodes</a></p>
        <p><a href="/node/example-node">Retrieve metrics for 'example-node'</a></p>
        <p><a href="/metrics">Metrics</a></p>
    </body>
</html>"#;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scraper: Scraper,
    pub metrics: ExporterMetrics,
}

impl AppState {
    pub fn new(scraper: Scraper, metrics: ExporterMetrics) -> Self {
        Self { scraper, metrics }
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Scrape every node in the cluster
async fn all_nodes(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    scrape(&state, ScrapeTarget::AllNodes, &headers).await
}

/// Scrape a single named node
async fn single_node(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    scrape(&state, ScrapeTarget::Node(name), &headers).await
}

async fn scrape(state: &AppState, target: ScrapeTarget, headers: &HeaderMap) -> Response {
    let timeout = headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_scrape_timeout);

    match state.scraper.scrape(&target, timeout).await {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, output.content_type)],
            output.body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error collecting node stats: {}", e),
        )
            .into_response(),
    }
}

/// Prometheus metrics about the exporter process
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            buffer,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error encoding metrics: {}", e),
        )
            .into_response(),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/nodes", get(all_nodes))
        .route("/node/:name", get(single_node))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Starting API server");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
