//! HTTP service for the video tracker.
//!
//! This crate provides:
//! - The push ingress endpoint that tracks one video per message
//! - Liveness and readiness probes
//! - Prometheus metrics rendering
//! - Structured API errors mapped to HTTP status codes

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
