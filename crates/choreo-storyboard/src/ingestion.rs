//! Turning parsed action sequences into storyboard nodes.
//!
//! Two sources feed ingestion: structured actions from scene analysis, and
//! raw `@Name action` text when analysis is unavailable. A failing action is
//! recorded and skipped; the rest of the sequence is still ingested.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use choreo_models::{
    CameraStyle, LightingStyle, NodeDraft, ParsedAction, SceneNode, Suggestions,
    DEFAULT_NODE_DURATION,
};

use crate::store::StoryboardStore;

/// `@Name` followed by everything up to the next `@`.
static MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\w+)\s+([^@]+)").unwrap());

/// Attribute values applied when an action carries no usable suggestion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDefaults {
    pub camera: CameraStyle,
    pub lighting: LightingStyle,
    pub duration: f64,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            camera: CameraStyle::default(),
            lighting: LightingStyle::default(),
            duration: DEFAULT_NODE_DURATION,
        }
    }
}

impl NodeDefaults {
    /// Defaults taken from learned preferences.
    pub fn from_suggestions(suggestions: &Suggestions) -> Self {
        Self {
            camera: suggestions.camera_suggestion,
            lighting: suggestions.lighting_suggestion,
            ..Self::default()
        }
    }
}

/// One action that could not become a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionFailure {
    /// Index within the submitted sequence
    pub index: usize,
    pub character: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub created: Vec<SceneNode>,
    pub failures: Vec<IngestionFailure>,
}

impl IngestionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A `@Name action` fragment of free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub character: String,
    pub action: String,
}

/// Extract `@Name action` fragments in order of appearance.
///
/// Fragments whose action is blank after trimming are dropped.
pub fn parse_mentions(text: &str) -> Vec<Mention> {
    MENTION_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let action = caps[2].trim();
            (!action.is_empty()).then(|| Mention {
                character: caps[1].to_string(),
                action: action.to_string(),
            })
        })
        .collect()
}

/// Appends action sequences to a scene.
pub struct SequenceIngestion<'a> {
    store: &'a StoryboardStore,
    defaults: NodeDefaults,
}

impl<'a> SequenceIngestion<'a> {
    pub fn new(store: &'a StoryboardStore) -> Self {
        Self {
            store,
            defaults: NodeDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: NodeDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Ingest structured actions. Positions continue from the scene's node
    /// count at the start of the call.
    pub async fn ingest_analysis(&self, scene_id: &str, actions: &[ParsedAction]) -> IngestionReport {
        let base = self.store.scene_len(scene_id).await as i64;
        let mut report = IngestionReport::default();

        for (index, action) in actions.iter().enumerate() {
            let draft = self.draft_from_action(scene_id, action, base + index as i64);
            self.push(&mut report, index, &action.character, draft).await;
        }

        self.log_report(scene_id, "analysis", &report);
        report
    }

    /// Ingest `@Name action` text with baseline attributes. Each node's
    /// position is its index among the mentions.
    pub async fn ingest_text(&self, scene_id: &str, text: &str) -> IngestionReport {
        let mut report = IngestionReport::default();

        for (index, mention) in parse_mentions(text).into_iter().enumerate() {
            let draft = NodeDraft::new(
                scene_id,
                format!("{} {}", mention.character, mention.action),
                vec![mention.character.clone()],
                mention.action,
            )
            .with_camera(CameraStyle::default())
            .with_lighting(LightingStyle::default())
            .with_duration(DEFAULT_NODE_DURATION)
            .with_position(index as i64);

            self.push(&mut report, index, &mention.character, draft).await;
        }

        self.log_report(scene_id, "text", &report);
        report
    }

    fn draft_from_action(&self, scene_id: &str, action: &ParsedAction, position: i64) -> NodeDraft {
        let camera = action
            .camera_suggestion
            .as_deref()
            .and_then(CameraStyle::from_suggestion)
            .unwrap_or(self.defaults.camera);
        let lighting = action
            .lighting_suggestion
            .as_deref()
            .and_then(LightingStyle::from_suggestion)
            .unwrap_or(self.defaults.lighting);
        let duration = action
            .duration_estimate
            .filter(|d| *d > 0.0 && d.is_finite())
            .unwrap_or(self.defaults.duration);

        NodeDraft::new(
            scene_id,
            format!("{} {}", action.character, action.action),
            vec![action.character.clone()],
            action.action.clone(),
        )
        .with_camera(camera)
        .with_lighting(lighting)
        .with_duration(duration)
        .with_position(position)
    }

    async fn push(&self, report: &mut IngestionReport, index: usize, character: &str, draft: NodeDraft) {
        match self.store.create(draft).await {
            Ok(node) => report.created.push(node),
            Err(e) => {
                warn!(index, character, error = %e, "Skipping action during ingestion");
                report.failures.push(IngestionFailure {
                    index,
                    character: character.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn log_report(&self, scene_id: &str, source: &str, report: &IngestionReport) {
        info!(
            scene_id,
            source,
            created = report.created.len(),
            failed = report.failures.len(),
            "Ingested action sequence"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choreo_models::Complexity;

    fn action(character: &str, action: &str) -> ParsedAction {
        ParsedAction {
            character: character.to_string(),
            action: action.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_mentions() {
        let mentions = parse_mentions("@Joey punches Bill @Bill falls down ");
        assert_eq!(
            mentions,
            vec![
                Mention {
                    character: "Joey".into(),
                    action: "punches Bill".into()
                },
                Mention {
                    character: "Bill".into(),
                    action: "falls down".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_mentions_without_markers() {
        assert!(parse_mentions("Joey punches Bill").is_empty());
        assert!(parse_mentions("").is_empty());
        assert!(parse_mentions("@Joey").is_empty());
    }

    #[tokio::test]
    async fn test_ingest_analysis_appends_after_existing_nodes() {
        let store = StoryboardStore::new();
        store
            .create(NodeDraft::new("s1", "opening", vec!["Ana".into()], "walks in"))
            .await
            .unwrap();

        let mut kick = action("Joey", "kicks");
        kick.camera_suggestion = Some("slow dolly in".into());
        kick.lighting_suggestion = Some("neon signs".into());
        kick.duration_estimate = Some(3.5);

        let report = SequenceIngestion::new(&store)
            .ingest_analysis("s1", &[kick, action("Bill", "blocks")])
            .await;

        assert!(report.is_complete());
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.created[0].position, 1);
        assert_eq!(report.created[0].camera, CameraStyle::Dolly);
        assert_eq!(report.created[0].lighting, LightingStyle::Neon);
        assert_eq!(report.created[0].duration, 3.5);
        assert_eq!(report.created[0].description, "Joey kicks");
        assert_eq!(report.created[1].position, 2);
        assert_eq!(report.created[1].camera, CameraStyle::Static);
        assert_eq!(report.created[1].duration, DEFAULT_NODE_DURATION);
    }

    #[tokio::test]
    async fn test_ingest_analysis_continues_past_failures() {
        let store = StoryboardStore::new();
        let actions = [action("Joey", "kicks"), action("", "nothing"), action("Bill", "falls")];

        let report = SequenceIngestion::new(&store).ingest_analysis("s1", &actions).await;

        assert_eq!(report.created.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(store.scene_len("s1").await, 2);
        assert_eq!(report.created[1].position, 2);
    }

    #[tokio::test]
    async fn test_ingest_analysis_uses_learned_defaults() {
        let store = StoryboardStore::new();
        let suggestions = Suggestions {
            camera_suggestion: CameraStyle::Handheld,
            lighting_suggestion: LightingStyle::Night,
            recommended_patterns: vec![],
            complexity_suggestion: Complexity::Medium,
            insight: String::new(),
        };

        let report = SequenceIngestion::new(&store)
            .with_defaults(NodeDefaults::from_suggestions(&suggestions))
            .ingest_analysis("s1", &[action("Joey", "runs")])
            .await;

        assert_eq!(report.created[0].camera, CameraStyle::Handheld);
        assert_eq!(report.created[0].lighting, LightingStyle::Night);
    }

    #[tokio::test]
    async fn test_ingest_text_uses_baseline_attributes() {
        let store = StoryboardStore::new();
        let report = SequenceIngestion::new(&store)
            .ingest_text("s1", "@Joey punches Bill @Bill falls")
            .await;

        assert_eq!(report.created.len(), 2);
        for (i, node) in report.created.iter().enumerate() {
            assert_eq!(node.position, i as i64);
            assert_eq!(node.camera, CameraStyle::Static);
            assert_eq!(node.lighting, LightingStyle::Daylight);
            assert_eq!(node.duration, DEFAULT_NODE_DURATION);
        }
        assert_eq!(report.created[1].characters, vec!["Bill".to_string()]);
        assert_eq!(report.created[1].action, "falls");
    }

    #[tokio::test]
    async fn test_ingest_text_without_mentions_creates_nothing() {
        let store = StoryboardStore::new();
        let report = SequenceIngestion::new(&store).ingest_text("s1", "no markers here").await;
        assert!(report.created.is_empty());
        assert!(report.is_complete());
    }
}
