//! Input validation shared by request types.

use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

/// Rejected user input, naming the offending fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvalidInput {
    pub fields: Vec<String>,
    pub message: String,
}

impl InvalidInput {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
            message: message.into(),
        }
    }

    /// Collapse `validator` output into a single message listing the fields.
    pub fn from_errors(errors: &ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort();

        let message = match fields.len() {
            0 => "invalid input".to_string(),
            1 => format!("{} is required and must not be empty", fields[0]),
            _ => format!("{} are required and must not be empty", fields.join(", ")),
        };

        Self { fields, message }
    }
}

pub(crate) fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

pub(crate) fn no_blank_entries(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(ValidationError::new("blank_entry"));
    }
    Ok(())
}
