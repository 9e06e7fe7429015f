//! Main application configuration
//!
//! This module defines the configuration structures for the exporter,
//! including environment variable loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default Mandrill tag statistics endpoint
pub const DEFAULT_MANDRILL_URL: &str = "https://mandrillapp.com/api/1.0/tags/list.json";

/// Default listen address (port 9153 is registered for this exporter)
pub const DEFAULT_LISTEN_ADDR: &str = ":9153";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub upstream: UpstreamSettings,
    pub metrics: MetricsSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Address the HTTP listener binds to (`host:port` or `:port`)
    pub listen_addr: String,
    /// Drain timeout for in-flight requests on shutdown, in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Mandrill API settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Tag statistics endpoint
    pub url: String,
    /// API key sent in the request body
    #[serde(skip_serializing)]
    pub api_key: String,
}

/// Exposition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Prefix prepended to every exported metric name
    pub namespace: String,
    /// Export process_* metrics alongside the tag statistics
    pub process_metrics: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "mandrill-exporter".to_string(),
            log_level: "info".to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            shutdown_timeout_seconds: 5,
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_MANDRILL_URL.to_string(),
            api_key: String::new(),
        }
    }
}

impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let api_key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("UpstreamSettings")
            .field("url", &self.url)
            .field("api_key", &api_key)
            .finish()
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            namespace: "mandrill".to_string(),
            process_metrics: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    ///
    /// The API key is never read from the file; it only comes from
    /// `MANDRILL_API_KEY`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.upstream.api_key = String::new();
        config.apply_overrides(|key| env::var(key).ok())?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Some(addr) = lookup("LISTEN_ADDR") {
            self.service.listen_addr = addr;
        }
        if let Some(timeout) = lookup("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        if let Some(url) = lookup("MANDRILL_API_URL") {
            self.upstream.url = url;
        }
        if let Some(api_key) = lookup("MANDRILL_API_KEY") {
            self.upstream.api_key = api_key;
        }

        if let Some(namespace) = lookup("METRICS_NAMESPACE") {
            self.metrics.namespace = namespace;
        }
        if let Some(process) = lookup("PROCESS_METRICS") {
            self.metrics.process_metrics = process
                .parse()
                .map_err(|_| anyhow!("Invalid PROCESS_METRICS value: {}", process))?;
        }

        Ok(())
    }

    /// Get shutdown drain timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Resolve the configured listen address
    pub async fn listen_addr(&self) -> Result<SocketAddr> {
        resolve_listen_addr(&self.service.listen_addr).await
    }
}

/// Check a listen address and expand the `:port` shorthand
///
/// `:port` means every interface and maps to the IPv6 wildcard, which
/// also accepts IPv4 on dual-stack hosts. No name resolution happens here.
pub fn normalize_listen_addr(addr: &str) -> Result<String> {
    let addr = addr.trim();
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("Listen address {} has no port", addr))?;
    port.parse::<u16>()
        .map_err(|_| anyhow!("Invalid port in listen address {}", addr))?;

    if host.is_empty() {
        Ok(format!("[::]:{}", port))
    } else {
        Ok(addr.to_string())
    }
}

/// Resolve a listen address on the runtime's blocking pool
pub async fn resolve_listen_addr(addr: &str) -> Result<SocketAddr> {
    let normalized = normalize_listen_addr(addr)?;
    let resolved = tokio::net::lookup_host(normalized.as_str())
        .await
        .map_err(|e| anyhow!("Invalid listen address {}: {}", addr, e))?
        .next()
        .ok_or_else(|| anyhow!("Listen address {} resolved to nothing", addr));
    resolved
}

/// Validate configuration values
///
/// An empty API key is accepted: the request is still sent and Mandrill
/// answers with an authentication error.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    normalize_listen_addr(&config.service.listen_addr)?;

    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if config.upstream.url.is_empty() {
        return Err(anyhow!("Mandrill API URL cannot be empty"));
    }

    let namespace = &config.metrics.namespace;
    let valid_namespace = namespace
        .chars()
        .enumerate()
        .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
    if !valid_namespace {
        return Err(anyhow!("Invalid metrics namespace: {}", namespace));
    }

    Ok(())
}
