//! Axum HTTP API server.
//!
//! This crate provides:
//! - JSON endpoints to create, list, inspect and rotate jobs
//! - Range-capable streaming, attachment download and HLS file serving
//! - Health/readiness probes and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
