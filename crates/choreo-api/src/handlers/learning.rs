//! Preference-learning handlers.

use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use choreo_learning::parse_event;
use choreo_models::{LearningStats, Outcome, PreferenceSummary, Suggestions, UpdatedPreferences};

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::session::Session;

#[derive(Debug, Deserialize)]
pub struct LearningEventRequest {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
}

#[derive(Serialize)]
pub struct LearningEventResponse {
    pub success: bool,
    pub message: String,
    pub updated_preferences: UpdatedPreferences,
}

/// `POST /api/learning`
pub async fn record_learning_event(
    Session(session): Session,
    ApiJson(request): ApiJson<LearningEventRequest>,
) -> ApiResult<Json<LearningEventResponse>> {
    if request.kind.trim().is_empty() || request.data.is_null() {
        return Err(ApiError::bad_request("Type and data are required"));
    }

    let event = parse_event(request.kind.trim(), request.data)?;
    let updated_preferences = session
        .preferences
        .record_event(event, request.context, request.outcome)
        .await?;

    Ok(Json(LearningEventResponse {
        success: true,
        message: "Learning data updated successfully".to_string(),
        updated_preferences,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LearningQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// One of the three learning views.
#[derive(Serialize)]
#[serde(untagged)]
pub enum LearningView {
    Suggestions { success: bool, suggestions: Suggestions },
    Preferences { success: bool, preferences: PreferenceSummary },
    Stats { success: bool, stats: LearningStats },
}

/// `GET /api/learning[?type=suggestions|preferences]`
///
/// Any other `type` returns the aggregate stats.
pub async fn query_learning(
    Session(session): Session,
    ApiQuery(query): ApiQuery<LearningQuery>,
) -> ApiResult<Json<LearningView>> {
    let model = &session.preferences;

    let view = match query.kind.as_deref() {
        Some("suggestions") => LearningView::Suggestions {
            success: true,
            suggestions: model.suggestions().await,
        },
        Some("preferences") => LearningView::Preferences {
            success: true,
            preferences: model.summary().await,
        },
        _ => LearningView::Stats {
            success: true,
            stats: model.stats().await,
        },
    };

    Ok(Json(view))
}
