//! Application wiring
//!
//! Builds the Mandrill client, collector and exporter metrics from the
//! configuration and runs them behind the lifecycle controller.

use crate::config::AppConfig;
use crate::error::ExporterError;
use crate::metrics::{create_router, ExporterMetrics, ServerState, TagCollector};
use crate::service::health::HealthState;
use crate::service::lifecycle::LifecycleController;
use crate::upstream::{MandrillClient, TagStatisticsSource};
use anyhow::Result;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Everything a running exporter needs, minus the listener
pub struct AppState {
    config: AppConfig,
    collector: TagCollector,
    exporter_metrics: ExporterMetrics,
}

impl AppState {
    /// Build the exporter against the configured Mandrill endpoint
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = MandrillClient::new(
            config.upstream.url.clone(),
            config.upstream.api_key.clone(),
        );
        Self::with_source(config, Arc::new(client))
    }

    /// Build the exporter over any statistics source
    pub fn with_source(config: AppConfig, source: Arc<dyn TagStatisticsSource>) -> Result<Self> {
        let exporter_metrics =
            ExporterMetrics::new(&config.metrics.namespace, config.metrics.process_metrics)?;
        let collector = TagCollector::new(source).with_metrics(exporter_metrics.clone());

        Ok(Self {
            config,
            collector,
            exporter_metrics,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the exporter self-metrics
    pub fn exporter_metrics(&self) -> &ExporterMetrics {
        &self.exporter_metrics
    }

    /// Build the HTTP router reading the given health state
    pub fn router(&self, health: HealthState) -> Router {
        create_router(ServerState {
            collector: self.collector.clone(),
            exporter_metrics: self.exporter_metrics.clone(),
            health,
            namespace: self.config.metrics.namespace.clone(),
        })
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), ExporterError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self
            .config
            .listen_addr()
            .await
            .map_err(|e| ExporterError::Configuration {
                message: e.to_string(),
            })?;

        let controller = LifecycleController::new(self.config.shutdown_timeout());
        let listener = controller.bind(addr).await?;
        info!(addr = %addr, "Listener bound");

        let router = self.router(controller.health());
        controller.serve(listener, router, shutdown).await
    }
}
