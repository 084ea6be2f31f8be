//! Storyboard error types.

use thiserror::Error;

use choreo_models::InvalidInput;

pub type StoryboardResult<T> = Result<T, StoryboardError>;

#[derive(Debug, Error)]
pub enum StoryboardError {
    #[error("Validation error: {0}")]
    Validation(#[from] InvalidInput),

    #[error("Storyboard node not found: {0}")]
    NotFound(String),
}

impl StoryboardError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoryboardError::NotFound(_))
    }
}
