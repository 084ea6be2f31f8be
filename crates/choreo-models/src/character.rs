//! Character roster entries.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{non_blank, InvalidInput};

/// A named participant in the action sequence.
///
/// Names are unique per session by convention only; nothing cross-checks them
/// against storyboard nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Generated portrait, base64-encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl Character {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: format!("char-{}", Uuid::new_v4()),
            name: name.into(),
            description: description.into(),
            image_base64: None,
            generated_at: Utc::now(),
        }
    }

    pub fn with_portrait(mut self, image_base64: impl Into<String>) -> Self {
        self.image_base64 = Some(image_base64.into());
        self
    }
}

/// Request to generate a character portrait.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CharacterRequest {
    #[serde(default)]
    #[validate(length(min = 1), custom(function = "non_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1), custom(function = "non_blank"))]
    pub description: String,
}

impl CharacterRequest {
    pub fn validate_request(&self) -> Result<(), InvalidInput> {
        self.validate().map_err(|e| InvalidInput::from_errors(&e))
    }

    /// Text-to-image prompt for the character's portrait.
    pub fn portrait_prompt(&self) -> String {
        format!(
            "Create a detailed character portrait of {}, {}. \
             Style: cinematic, professional character design, detailed facial features, dramatic lighting, \
             high quality, 8k resolution, realistic, movie character design, professional photography. \
             The character should look ready for action scenes with dynamic pose and intense expression. \
             Background should be subtle and cinematic.",
            self.name.trim(),
            self.description.trim()
        )
    }
}
