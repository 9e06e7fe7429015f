//! Mandrill Exporter - Prometheus exporter for Mandrill tag statistics
//!
//! On every scrape this crate fetches per-tag delivery statistics from the
//! Mandrill API and republishes them as labeled Prometheus samples, next to
//! a liveness probe and a small landing page.

pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod types;
pub mod upstream;

// Re-export commonly used types and traits
pub use error::{ExporterError, Result, UpstreamError};
pub use types::*;

// Re-export key components
pub use metrics::TagCollector;
pub use service::{AppState, HealthState, HealthStatus, LifecycleController};
pub use upstream::{MandrillClient, TagStatisticsSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
