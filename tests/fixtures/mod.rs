//! Test fixtures: a stub Mandrill API and a running exporter

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use mandrill_exporter::config::AppConfig;
use mandrill_exporter::{AppState, ExporterError, HealthState, LifecycleController};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const TAGS_PATH: &str = "/api/1.0/tags/list.json";

/// Canned response served by the stub
#[derive(Clone)]
pub struct StubResponse {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl StubResponse {
    pub fn ok(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone)]
struct StubState {
    response: StubResponse,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Local stand-in for the Mandrill tags endpoint
pub struct StubMandrill {
    pub url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    handle: JoinHandle<()>,
}

impl StubMandrill {
    pub async fn start(response: StubResponse) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            response,
            requests: requests.clone(),
        };

        let app = Router::new()
            .route(TAGS_PATH, post(stub_handler))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{}{}", addr, TAGS_PATH),
            requests,
            handle,
        }
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Drop for StubMandrill {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn stub_handler(
    State(state): State<StubState>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(body);
    }
    tokio::time::sleep(state.response.delay).await;
    (state.response.status, state.response.body.clone())
}

/// An exporter serving on an ephemeral port
pub struct RunningExporter {
    pub addr: SocketAddr,
    pub health: HealthState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ExporterError>>,
}

impl RunningExporter {
    pub async fn start(upstream_url: &str, api_key: &str, drain_timeout: Duration) -> Self {
        let mut config = AppConfig::default();
        config.upstream.url = upstream_url.to_string();
        config.upstream.api_key = api_key.to_string();
        config.metrics.process_metrics = false;

        let app = AppState::new(config).unwrap();
        let controller = LifecycleController::new(drain_timeout);
        let health = controller.health();
        let listener = controller
            .bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app.router(controller.health());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            controller
                .serve(listener, router, async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let exporter = Self {
            addr,
            health,
            shutdown: Some(shutdown_tx),
            handle,
        };
        exporter.wait_until_healthy().await;
        exporter
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn wait_until_healthy(&self) {
        for _ in 0..100 {
            if self.health.is_healthy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("exporter did not become healthy");
    }

    /// Request shutdown without waiting for it to finish
    pub fn begin_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Request shutdown and wait for the drain to finish
    pub async fn shutdown(mut self) -> Result<(), ExporterError> {
        self.begin_shutdown();
        self.handle.await.unwrap()
    }

    pub async fn join(self) -> Result<(), ExporterError> {
        self.handle.await.unwrap()
    }
}

/// Fresh client per request so no pooled connection outlives a test step
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
