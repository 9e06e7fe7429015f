//! Configuration management for the exporter
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;

// Re-export commonly used types
pub use app::{
    normalize_listen_addr, resolve_listen_addr, validate_config, AppConfig, MetricsSettings,
    ServiceSettings, UpstreamSettings,
};
