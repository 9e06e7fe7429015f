//! Service layer for the exporter
//!
//! This module contains the application wiring, the process health state
//! and the listener lifecycle.

pub mod app;
pub mod health;
pub mod lifecycle;

pub use app::AppState;
pub use health::{HealthState, HealthStatus};
pub use lifecycle::{shutdown_signal, LifecycleController};
