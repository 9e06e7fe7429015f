//! HTTP endpoints: landing page, liveness probe and Prometheus scrape
//!
//! - `/` - Static HTML landing page
//! - `/healthz` - 204 while healthy, 503 while starting or shutting down
//! - `/metrics` - Tag statistics and exporter metrics in text format

use crate::metrics::collector::TagCollector;
use crate::metrics::encoding::{content_type, render};
use crate::metrics::exporter::ExporterMetrics;
use crate::service::health::HealthState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, error, info};

const INDEX_PAGE: &str = r#"<html>
<head><title>Mandrill statistics Exporter</title></head>
<body>
<h1>Mandrill statistics Exporter</h1>
<p><a href='metrics'>Metrics</a></p>
</body>
</html>
"#;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct ServerState {
    pub collector: TagCollector,
    pub exporter_metrics: ExporterMetrics,
    pub health: HealthState,
    pub namespace: String,
}

/// Build the router with every endpoint and request logging
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Landing page handler
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Liveness probe handler
async fn healthz_handler(State(state): State<ServerState>) -> StatusCode {
    if state.health.is_healthy() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus scrape handler
///
/// Calls Mandrill on every request. Upstream failures are absorbed by the
/// collector, so the response is 200 with whatever samples were collected.
async fn metrics_handler(State(state): State<ServerState>) -> Response {
    let start = Instant::now();

    let samples = state.collector.collect().await;
    state.exporter_metrics.observe_scrape(start.elapsed());

    match render(&state.namespace, &samples, state.exporter_metrics.gather()) {
        Ok(body) => {
            debug!(samples = samples.len(), "Serving scrape");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type())],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Log every request once it has been answered
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    info!(
        %method,
        path = %path,
        remote = %remote,
        user_agent = %user_agent,
        status = response.status().as_u16(),
        "http request"
    );
    response
}
