//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub active_sessions: usize,
    pub checks: ReadinessChecks,
}

/// Vendor configuration. Unconfigured vendors don't make the server unready;
/// the affected endpoints answer with `setup_required` instead.
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub runcomfy: CheckStatus,
    pub ai: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckStatus {
    fn from_configured(configured: bool, env_var: &str) -> Self {
        if configured {
            Self {
                status: "configured".to_string(),
                detail: None,
            }
        } else {
            Self {
                status: "setup_required".to_string(),
                detail: Some(format!("{env_var} is not set")),
            }
        }
    }
}

/// Readiness check endpoint.
pub async fn ready(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let vendor = &state.vendor;

    Json(ReadinessResponse {
        status: "ready".to_string(),
        active_sessions: state.sessions.len().await,
        checks: ReadinessChecks {
            runcomfy: CheckStatus::from_configured(
                vendor.config.runcomfy_configured(),
                "RUNCOMFY_API_KEY",
            ),
            ai: CheckStatus::from_configured(vendor.config.ai.is_configured(), "AI_API_KEY"),
        },
    })
}
