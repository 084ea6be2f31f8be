//! Axum HTTP API server for the Choreo action studio.
//!
//! This crate provides:
//! - Storyboard, ingestion and render endpoints
//! - Preference learning endpoints
//! - Job proxies for the video generation vendors
//! - Per-session state selected by the `X-Session-Id` header
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use session::{SessionRegistry, StudioSession};
pub use state::AppState;
