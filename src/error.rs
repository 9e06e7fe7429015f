//! Error types for the exporter
//!
//! Upstream failures are recovered inside the collection path; lifecycle
//! failures terminate the process.

use std::net::SocketAddr;
use std::time::Duration;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Failures reaching or decoding the Mandrill statistics endpoint
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Mandrill request failed: {message}")]
    Transport { message: String },

    #[error("Mandrill API returned {status}: {name}: {message}")]
    Api {
        status: u16,
        name: String,
        message: String,
    },

    #[error("Failed to parse Mandrill response: {message}")]
    Parse { message: String },
}

impl UpstreamError {
    /// Short label used for the upstream error counter
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport { .. } => "transport",
            UpstreamError::Api { .. } => "api",
            UpstreamError::Parse { .. } => "parse",
        }
    }
}

/// Fatal process-level errors
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("Could not listen on {addr}: {source}")]
    ListenerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not gracefully shutdown the server within {timeout:?}")]
    ShutdownDrainTimeout { timeout: Duration },

    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}
