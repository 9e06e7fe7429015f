//! Metrics collection and exposition for the exporter
//!
//! This module maps Mandrill tag statistics onto the fixed metric set,
//! encodes them in the Prometheus text format, and serves the HTTP
//! endpoints that expose them.

pub mod collector;
pub mod encoding;
pub mod exporter;
pub mod health;

pub use collector::{samples_from, TagCollector};
pub use encoding::{encode_samples, render};
pub use exporter::ExporterMetrics;
pub use health::{create_router, ServerState};
