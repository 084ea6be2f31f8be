//! Scene analysis handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use choreo_models::{ActionAnalysis, InvalidInput};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::metrics;
use crate::state::AppState;

const CAPABILITIES: [&str; 7] = [
    "Action sequence parsing",
    "Character intent analysis",
    "Camera movement suggestions",
    "Lighting recommendations",
    "Duration estimation",
    "Scene complexity assessment",
    "Cinematic enhancement",
];

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: ActionAnalysis,
    pub original_text: String,
    pub processed_at: String,
}

/// `POST /api/nlp/analyze`
pub async fn analyze_text(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    if request.text.trim().is_empty() {
        return Err(InvalidInput::new("text", "Text input is required").into());
    }

    let analysis = state
        .vendor
        .analyzer
        .analyze(&request.text, request.context.as_deref())
        .await
        .map_err(|e| {
            if e.is_setup_required() {
                metrics::record_setup_required("scene_analysis");
            }
            ApiError::from(e)
        })?;

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis,
        original_text: request.text,
        processed_at: Utc::now().to_rfc3339(),
    }))
}

#[derive(Serialize)]
pub struct CapabilitiesResponse {
    pub success: bool,
    pub message: String,
    pub configured: bool,
    pub capabilities: Vec<&'static str>,
}

/// `GET /api/nlp/analyze`
pub async fn nlp_capabilities(State(state): State<AppState>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        success: true,
        message: "NLP processing endpoint is available".to_string(),
        configured: state.vendor.analyzer.is_configured(),
        capabilities: CAPABILITIES.to_vec(),
    })
}
