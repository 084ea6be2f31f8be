//! Storyboard node definitions.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{no_blank_entries, non_blank, InvalidInput};
use crate::{CameraStyle, LightingStyle};

/// Default node duration in seconds.
pub const DEFAULT_NODE_DURATION: f64 = 2.0;

/// Unique identifier for a storyboard node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Generate a new random node ID.
    pub fn new() -> Self {
        Self(format!("node-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One choreographed beat of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneNode {
    pub id: NodeId,
    /// Owning scene; fixed at creation.
    pub scene_id: String,
    pub description: String,
    pub characters: Vec<String>,
    pub action: String,
    pub camera: CameraStyle,
    pub lighting: LightingStyle,
    /// Seconds
    pub duration: f64,
    /// Display/render order within the scene. Unique per scene is not enforced
    /// by renumbering; ties are resolved by insertion order.
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SceneNode {
    /// Build a node from a validated draft at the given position.
    pub fn from_draft(draft: NodeDraft, position: i64) -> Self {
        let now = Utc::now();
        Self {
            id: NodeId::new(),
            scene_id: draft.scene_id,
            description: draft.description,
            characters: draft.characters,
            action: draft.action,
            camera: draft.camera.unwrap_or_default(),
            lighting: draft.lighting.unwrap_or_default(),
            duration: draft.duration.unwrap_or(DEFAULT_NODE_DURATION),
            position,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the fields present in `patch`. Call `NodePatch::validate_patch` first.
    pub fn apply(&mut self, patch: NodePatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(characters) = patch.characters {
            self.characters = characters;
        }
        if let Some(action) = patch.action {
            self.action = action;
        }
        if let Some(camera) = patch.camera {
            self.camera = camera;
        }
        if let Some(lighting) = patch.lighting {
            self.lighting = lighting;
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        self.touch();
    }

    /// Advance `updated_at`; it strictly increases on every mutation.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

/// Input for creating a node.
///
/// Required text fields default to empty so a missing field fails validation
/// instead of deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NodeDraft {
    #[serde(default)]
    #[validate(length(min = 1), custom(function = "non_blank"))]
    pub scene_id: String,
    #[serde(default)]
    #[validate(length(min = 1), custom(function = "non_blank"))]
    pub description: String,
    #[serde(default, deserialize_with = "one_or_many")]
    #[validate(length(min = 1), custom(function = "no_blank_entries"))]
    pub characters: Vec<String>,
    #[serde(default)]
    #[validate(length(min = 1), custom(function = "non_blank"))]
    pub action: String,
    #[serde(default)]
    pub camera: Option<CameraStyle>,
    #[serde(default)]
    pub lighting: Option<LightingStyle>,
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0))]
    pub duration: Option<f64>,
    /// Explicit position; `Some(0)` is honored.
    #[serde(default)]
    pub position: Option<i64>,
}

impl NodeDraft {
    pub fn new(
        scene_id: impl Into<String>,
        description: impl Into<String>,
        characters: Vec<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            scene_id: scene_id.into(),
            description: description.into(),
            characters,
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_camera(mut self, camera: CameraStyle) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_lighting(mut self, lighting: LightingStyle) -> Self {
        self.lighting = Some(lighting);
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn validate_draft(&self) -> Result<(), InvalidInput> {
        self.validate().map_err(|e| InvalidInput::from_errors(&e))
    }
}

/// Partial update for a node. Only fields present in the patch are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "optional_one_or_many")]
    pub characters: Option<Vec<String>>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub camera: Option<CameraStyle>,
    #[serde(default)]
    pub lighting: Option<LightingStyle>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub position: Option<i64>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// A present field must still satisfy the node invariants.
    pub fn validate_patch(&self) -> Result<(), InvalidInput> {
        for (field, value) in [("description", &self.description), ("action", &self.action)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(InvalidInput::new(field, format!("{field} must not be empty")));
            }
        }

        if let Some(characters) = &self.characters {
            if characters.is_empty() || characters.iter().any(|c| c.trim().is_empty()) {
                return Err(InvalidInput::new(
                    "characters",
                    "characters must contain at least one non-empty name",
                ));
            }
        }

        if let Some(duration) = self.duration {
            if duration <= 0.0 || !duration.is_finite() {
                return Err(InvalidInput::new(
                    "duration",
                    "duration must be a positive number of seconds",
                ));
            }
        }

        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Accept `"Joey"` as shorthand for `["Joey"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(OneOrMany::deserialize(deserializer)?.into())
}

fn optional_one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NodeDraft {
        NodeDraft::new("scene-1", "Joey lunges", vec!["Joey".into()], "lunge")
    }

    #[test]
    fn test_draft_defaults() {
        let node = SceneNode::from_draft(draft(), 0);
        assert_eq!(node.camera, CameraStyle::Static);
        assert_eq!(node.lighting, LightingStyle::Daylight);
        assert_eq!(node.duration, DEFAULT_NODE_DURATION);
        assert_eq!(node.created_at, node.updated_at);
        assert!(node.id.as_str().starts_with("node-"));
    }

    #[test]
    fn test_draft_validation_lists_missing_fields() {
        let mut d = draft();
        d.description = String::new();
        d.characters.clear();
        let err = d.validate_draft().unwrap_err();
        assert_eq!(err.fields, vec!["characters".to_string(), "description".to_string()]);
        assert!(err.message.contains("are required"));
    }

    #[test]
    fn test_draft_rejects_blank_and_non_positive_duration() {
        let mut d = draft();
        d.action = "   ".into();
        assert!(d.validate_draft().is_err());

        let d = draft().with_duration(0.0);
        assert_eq!(d.validate_draft().unwrap_err().fields, vec!["duration".to_string()]);
    }

    #[test]
    fn test_characters_accepts_single_string() {
        let d: NodeDraft = serde_json::from_str(
            r#"{"scene_id":"s","description":"d","characters":"Joey","action":"a"}"#,
        )
        .unwrap();
        assert_eq!(d.characters, vec!["Joey".to_string()]);

        let missing: NodeDraft = serde_json::from_str(r#"{"description":"d"}"#).unwrap();
        assert!(missing.validate_draft().is_err());
    }

    #[test]
    fn test_empty_patch_only_touches_updated_at() {
        let mut node = SceneNode::from_draft(draft(), 3);
        let before = node.clone();
        node.apply(NodePatch::default());

        assert!(node.updated_at > before.updated_at);
        assert_eq!(node.created_at, before.created_at);
        assert_eq!(node.description, before.description);
        assert_eq!(node.position, before.position);
    }

    #[test]
    fn test_patch_position_zero_is_applied() {
        let mut node = SceneNode::from_draft(draft(), 3);
        let patch: NodePatch = serde_json::from_str(r#"{"position":0}"#).unwrap();
        node.apply(patch);
        assert_eq!(node.position, 0);
    }

    #[test]
    fn test_patch_validation() {
        let patch = NodePatch {
            description: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate_patch().is_err());

        let patch = NodePatch {
            duration: Some(0.0),
            ..Default::default()
        };
        assert_eq!(patch.validate_patch().unwrap_err().fields, vec!["duration".to_string()]);

        let patch = NodePatch {
            characters: Some(vec![]),
            ..Default::default()
        };
        assert!(patch.validate_patch().is_err());

        assert!(NodePatch::default().validate_patch().is_ok());
    }
}
