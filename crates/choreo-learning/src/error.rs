//! Learning error types.

use thiserror::Error;

use choreo_models::InvalidInput;

pub type LearningResult<T> = Result<T, LearningError>;

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("Validation error: {0}")]
    Validation(#[from] InvalidInput),

    #[error("Unknown learning event type: {0}")]
    UnknownKind(String),

    #[error("Invalid payload for {kind}: {message}")]
    InvalidPayload { kind: String, message: String },
}

impl LearningError {
    pub fn invalid_payload(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
