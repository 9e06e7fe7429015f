//! The exporter's own metrics
//!
//! Unlike the tag samples, these live for the whole process: how many
//! scrapes were served, how long they took, and how often Mandrill failed.

use crate::error::UpstreamError;
use anyhow::Result;
use prometheus::proto::MetricFamily;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;

/// Long-lived registry of exporter self-metrics
#[derive(Clone)]
pub struct ExporterMetrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Scrapes served on `/metrics`
    pub scrapes_total: IntCounter,

    /// Failed upstream fetches by kind (transport, api, parse)
    pub upstream_errors_total: IntCounterVec,

    /// Time spent serving a scrape, upstream call included
    pub scrape_duration_seconds: Histogram,
}

impl ExporterMetrics {
    /// Create the self-metrics under `<namespace>_exporter_*`
    ///
    /// With `process_metrics` set, the standard `process_*` collector is
    /// registered as well (Linux only).
    pub fn new(namespace: &str, process_metrics: bool) -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let scrapes_total = IntCounter::with_opts(
            Opts::new("scrapes_total", "Total number of scrapes served")
                .namespace(namespace)
                .subsystem("exporter"),
        )?;
        registry.register(Box::new(scrapes_total.clone()))?;

        let upstream_errors_total = IntCounterVec::new(
            Opts::new(
                "upstream_errors_total",
                "Total number of failed Mandrill API calls",
            )
            .namespace(namespace)
            .subsystem("exporter"),
            &["kind"],
        )?;
        registry.register(Box::new(upstream_errors_total.clone()))?;

        let scrape_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scrape_duration_seconds",
                "Time spent collecting and encoding a scrape",
            )
            .namespace(namespace)
            .subsystem("exporter")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        if process_metrics {
            register_process_collector(&registry)?;
        }

        Ok(Self {
            registry,
            scrapes_total,
            upstream_errors_total,
            scrape_duration_seconds,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Count a failed upstream fetch
    pub fn record_upstream_error(&self, error: &UpstreamError) {
        self.upstream_errors_total
            .with_label_values(&[error.kind()])
            .inc();
    }

    /// Record a served scrape
    pub fn observe_scrape(&self, duration: Duration) {
        self.scrapes_total.inc();
        self.scrape_duration_seconds.observe(duration.as_secs_f64());
    }

    /// Current count of upstream errors of the given kind
    pub fn upstream_errors(&self, kind: &str) -> u64 {
        self.upstream_errors_total.with_label_values(&[kind]).get()
    }

    /// Snapshot of every self-metric family
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) -> Result<()> {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    registry.register(Box::new(collector))?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) -> Result<()> {
    Ok(())
}
