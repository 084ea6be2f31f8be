//! Character portrait generation.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use choreo_models::{Character, CharacterRequest};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CharacterResponse {
    pub success: bool,
    pub character: Character,
}

/// `POST /api/characters/generate`
///
/// Generates the portrait synchronously and returns it inline as base64.
pub async fn generate_character(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CharacterRequest>,
) -> ApiResult<Json<CharacterResponse>> {
    let character = state.vendor.portraits.generate(&request).await.map_err(|e| {
        if e.is_setup_required() {
            metrics::record_setup_required("character_portrait");
        }
        ApiError::from(e)
    })?;

    Ok(Json(CharacterResponse {
        success: true,
        character,
    }))
}
