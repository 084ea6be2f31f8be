//! Vendor error types.

use thiserror::Error;

use choreo_models::InvalidInput;

pub type VendorResult<T> = Result<T, VendorError>;

#[derive(Debug, Error)]
pub enum VendorError {
    /// A credential or deployment is missing. Raised before any network call.
    #[error("Service not configured: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    Validation(#[from] InvalidInput),

    #[error("Upstream error{}: {message}", status_suffix(.status))]
    Upstream { status: Option<u16>, message: String },

    /// Every configured status endpoint failed.
    #[error("Job status unavailable after trying {attempts} endpoints: {last_error}")]
    Unavailable { attempts: usize, last_error: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl VendorError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn upstream(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// The caller should render setup guidance instead of a failure.
    pub fn is_setup_required(&self) -> bool {
        matches!(self, VendorError::Configuration(_))
    }

    /// Transient failures worth retrying: connection problems, timeouts,
    /// throttling and vendor 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            VendorError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            VendorError::Upstream {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
