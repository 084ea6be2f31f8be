//! Preference-learning events and the views derived from them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{CameraStyle, LightingStyle};

/// Maximum number of retained learning history entries.
pub const HISTORY_CAPACITY: usize = 1000;

/// Success ratio a pattern must exceed to be recommended.
pub const SUCCESS_RATIO_THRESHOLD: f64 = 0.7;

/// Kind of usage event fed into the preference model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LearningEventKind {
    CameraUsage,
    LightingUsage,
    ActionPattern,
    SceneRender,
    UserFeedback,
}

impl LearningEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningEventKind::CameraUsage => "camera_usage",
            LearningEventKind::LightingUsage => "lighting_usage",
            LearningEventKind::ActionPattern => "action_pattern",
            LearningEventKind::SceneRender => "scene_render",
            LearningEventKind::UserFeedback => "user_feedback",
        }
    }
}

impl fmt::Display for LearningEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LearningEventKind {
    type Err = EventKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camera_usage" => Ok(LearningEventKind::CameraUsage),
            "lighting_usage" => Ok(LearningEventKind::LightingUsage),
            "action_pattern" => Ok(LearningEventKind::ActionPattern),
            "scene_render" => Ok(LearningEventKind::SceneRender),
            "user_feedback" => Ok(LearningEventKind::UserFeedback),
            _ => Err(EventKindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown learning event type: {0}")]
pub struct EventKindParseError(String);

/// Result the user attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    #[default]
    Neutral,
}

/// Preferred scene complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightingUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPatternUsage {
    #[serde(default)]
    pub pattern: String,
    /// Seconds; 2 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneRenderUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_lighting: Option<String>,
}

/// A usage event, tagged by kind, carrying only the fields that kind reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LearningEvent {
    CameraUsage(CameraUsage),
    LightingUsage(LightingUsage),
    ActionPattern(ActionPatternUsage),
    SceneRender(SceneRenderUsage),
    UserFeedback(UserFeedback),
}

impl LearningEvent {
    pub fn camera_usage(camera: impl Into<String>) -> Self {
        Self::CameraUsage(CameraUsage {
            camera: Some(camera.into()),
        })
    }

    pub fn lighting_usage(lighting: impl Into<String>) -> Self {
        Self::LightingUsage(LightingUsage {
            lighting: Some(lighting.into()),
        })
    }

    pub fn action_pattern(pattern: impl Into<String>, duration: Option<f64>) -> Self {
        Self::ActionPattern(ActionPatternUsage {
            pattern: pattern.into(),
            duration,
        })
    }

    pub fn scene_render(complexity: Option<Complexity>, genre: Option<String>) -> Self {
        Self::SceneRender(SceneRenderUsage { complexity, genre })
    }

    pub fn user_feedback(camera: Option<String>, lighting: Option<String>) -> Self {
        Self::UserFeedback(UserFeedback {
            preferred_camera: camera,
            preferred_lighting: lighting,
        })
    }

    pub fn kind(&self) -> LearningEventKind {
        match self {
            LearningEvent::CameraUsage(_) => LearningEventKind::CameraUsage,
            LearningEvent::LightingUsage(_) => LearningEventKind::LightingUsage,
            LearningEvent::ActionPattern(_) => LearningEventKind::ActionPattern,
            LearningEvent::SceneRender(_) => LearningEventKind::SceneRender,
            LearningEvent::UserFeedback(_) => LearningEventKind::UserFeedback,
        }
    }

    /// Decode the untyped `data` payload for a given kind.
    pub fn from_parts(kind: LearningEventKind, data: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            LearningEventKind::CameraUsage => Self::CameraUsage(serde_json::from_value(data)?),
            LearningEventKind::LightingUsage => Self::LightingUsage(serde_json::from_value(data)?),
            LearningEventKind::ActionPattern => Self::ActionPattern(serde_json::from_value(data)?),
            LearningEventKind::SceneRender => Self::SceneRender(serde_json::from_value(data)?),
            LearningEventKind::UserFeedback => Self::UserFeedback(serde_json::from_value(data)?),
        })
    }

    /// The payload alone, used as history context when none is supplied.
    pub fn payload(&self) -> Value {
        let value = match self {
            LearningEvent::CameraUsage(p) => serde_json::to_value(p),
            LearningEvent::LightingUsage(p) => serde_json::to_value(p),
            LearningEvent::ActionPattern(p) => serde_json::to_value(p),
            LearningEvent::SceneRender(p) => serde_json::to_value(p),
            LearningEvent::UserFeedback(p) => serde_json::to_value(p),
        };
        value.unwrap_or(Value::Null)
    }
}

/// Usage statistics for a named choreography motif.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionPattern {
    pub pattern: String,
    pub success_count: u32,
    pub usage_count: u32,
    pub avg_duration: f64,
}

impl ActionPattern {
    pub fn success_rate(&self) -> f64 {
        if self.usage_count == 0 {
            return 0.0;
        }
        f64::from(self.success_count) / f64::from(self.usage_count)
    }

    pub fn is_successful(&self) -> bool {
        self.success_rate() > SUCCESS_RATIO_THRESHOLD
    }
}

/// One entry of the rolling learning history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action_type: LearningEventKind,
    pub context: Value,
    pub outcome: Outcome,
}

/// Returned after every recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedPreferences {
    pub top_camera: CameraStyle,
    pub top_lighting: LightingStyle,
    pub successful_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub camera_suggestion: CameraStyle,
    pub lighting_suggestion: LightingStyle,
    pub recommended_patterns: Vec<String>,
    pub complexity_suggestion: Complexity,
    pub insight: String,
}

/// Preference view for the `preferences` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSummary {
    pub camera: BTreeMap<CameraStyle, u64>,
    pub lighting: BTreeMap<LightingStyle, u64>,
    pub complexity: Complexity,
    pub genres: Vec<String>,
    pub successful_patterns: Vec<ActionPattern>,
}

/// Aggregate view for the default learning query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_learning_events: usize,
    pub top_camera: CameraStyle,
    pub top_lighting: LightingStyle,
    pub preferred_complexity: Complexity,
    pub most_successful_pattern: String,
    pub learning_progress: f64,
}
