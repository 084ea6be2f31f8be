//! Structured action analysis returned by the scene-analysis service.
//!
//! Every field is optional on the wire: the analysis comes from a language
//! model and is only loosely shaped.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One character beat extracted from free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedAction {
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub action: String,
    /// attack | defend | move | interact | emote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// low | medium | high
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting_suggestion: Option<String>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_estimate: Option<f64>,
}

/// Whole-scene observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing: Option<String>,
    #[serde(default)]
    pub suggested_camera_work: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_lighting: Option<String>,
    /// 1-10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionAnalysis {
    #[serde(default)]
    pub actions: Vec<ParsedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_analysis: Option<SceneAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_description: Option<String>,
    #[serde(default)]
    pub storyboard_suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_analysis_deserializes() {
        let analysis: ActionAnalysis = serde_json::from_str(
            r#"{"actions":[{"character":"Joey","action":"throws a jab","duration_estimate":1.5}]}"#,
        )
        .unwrap();

        assert_eq!(analysis.actions.len(), 1);
        assert_eq!(analysis.actions[0].duration_estimate, Some(1.5));
        assert!(analysis.actions[0].camera_suggestion.is_none());
        assert!(analysis.scene_analysis.is_none());
        assert!(analysis.storyboard_suggestions.is_empty());
    }
}
