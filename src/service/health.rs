//! Process health state consulted by the liveness probe
//!
//! The state only moves forward: `starting` until the listener is bound,
//! `healthy` while serving, `unhealthy` once shutdown begins. Handlers get
//! read access; transitions belong to the lifecycle controller.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Health status of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Starting,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            STARTING => HealthStatus::Starting,
            HEALTHY => HealthStatus::Healthy,
            _ => HealthStatus::Unhealthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Starting => write!(f, "starting"),
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

const STARTING: u8 = 0;
const HEALTHY: u8 = 1;
const UNHEALTHY: u8 = 2;

/// Shared, atomically updated health status
///
/// Clones share the same underlying value.
#[derive(Debug, Clone)]
pub struct HealthState {
    status: Arc<AtomicU8>,
}

impl HealthState {
    /// Create a new health state (initially starting)
    pub fn new() -> Self {
        Self {
            status: Arc::new(AtomicU8::new(STARTING)),
        }
    }

    /// Current status
    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Whether the liveness probe should succeed
    pub fn is_healthy(&self) -> bool {
        self.status() == HealthStatus::Healthy
    }

    /// Move from starting to healthy
    ///
    /// Returns false without changing anything if shutdown already began.
    pub(crate) fn mark_healthy(&self) -> bool {
        self.status
            .compare_exchange(STARTING, HEALTHY, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Enter the terminal unhealthy state
    ///
    /// Returns true for the call that performed the transition.
    pub(crate) fn mark_unhealthy(&self) -> bool {
        self.status.swap(UNHEALTHY, Ordering::SeqCst) != UNHEALTHY
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}
