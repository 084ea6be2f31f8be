//! API error types.
//!
//! Every failure renders as `{success: false, error, kind, ...}` so the UI can
//! tell a missing credential (`setup_required`) from a vendor outage or a bad
//! request.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use choreo_learning::LearningError;
use choreo_models::InvalidInput;
use choreo_storyboard::StoryboardError;
use choreo_vendor::VendorError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(InvalidInput),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A vendor credential or deployment is missing.
    #[error("{0}")]
    SetupRequired(String),

    #[error("Upstream service error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Upstream service unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SetupRequired(_) | ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::SetupRequired(_) => "configuration_error",
            ApiError::Upstream { .. } => "upstream_error",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::RateLimited => "rate_limited",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoryboardError> for ApiError {
    fn from(err: StoryboardError) -> Self {
        match err {
            StoryboardError::Validation(e) => ApiError::Validation(e),
            StoryboardError::NotFound(id) => ApiError::NotFound(format!("Storyboard node not found: {id}")),
        }
    }
}

impl From<LearningError> for ApiError {
    fn from(err: LearningError) -> Self {
        match err {
            LearningError::Validation(e) => ApiError::Validation(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<VendorError> for ApiError {
    fn from(err: VendorError) -> Self {
        match err {
            VendorError::Configuration(msg) => ApiError::SetupRequired(msg),
            VendorError::Validation(e) => ApiError::Validation(e),
            VendorError::NotFound(msg) => ApiError::NotFound(msg),
            VendorError::Upstream { status, message } => ApiError::Upstream { status, message },
            e @ VendorError::Unavailable { .. } => ApiError::Unavailable(e.to_string()),
            e @ (VendorError::Network(_) | VendorError::Json(_) | VendorError::InvalidResponse(_)) => {
                ApiError::Upstream {
                    status: None,
                    message: e.to_string(),
                }
            }
        }
    }
}

impl From<InvalidInput> for ApiError {
    fn from(err: InvalidInput) -> Self {
        ApiError::Validation(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    setup_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
}

fn is_production() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|e| e.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}

impl ApiError {
    /// Render the error body. Production hides internal details; vendor
    /// detail on upstream failures is always kept.
    fn render(self, production: bool) -> Response {
        let status = self.status_code();

        let error = match &self {
            ApiError::Internal(_) if production => "An internal error occurred".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error,
            kind: self.kind(),
            setup_required: matches!(self, ApiError::SetupRequired(_)).then_some(true),
            fields: match &self {
                ApiError::Validation(e) => Some(e.fields.clone()),
                _ => None,
            },
            upstream_status: match &self {
                ApiError::Upstream { status, .. } => *status,
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.render(is_production())
    }
}

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections render as [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
