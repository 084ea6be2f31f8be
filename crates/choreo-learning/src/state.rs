//! Preference state and the pure learning rules applied to it.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use choreo_models::{
    ActionPattern, ActionPatternUsage, CameraStyle, Complexity, HistoryEntry, InvalidInput,
    LearningEvent, LearningStats, LightingStyle, Outcome, PreferenceSummary, SceneRenderUsage,
    Suggestions, UpdatedPreferences, UserFeedback, DEFAULT_NODE_DURATION, HISTORY_CAPACITY,
};

use crate::error::LearningResult;

/// Seed weight for every known option.
pub const SEED_WEIGHT: u64 = 1;

/// Weight added per passive usage event.
pub const USAGE_WEIGHT: u64 = 1;

/// Weight added per explicit feedback event.
pub const FEEDBACK_WEIGHT: u64 = 2;

/// Weight above which a preference drives the insight.
const INSIGHT_WEIGHT_THRESHOLD: u64 = 3;

/// Pattern count above which the pattern insight applies.
const INSIGHT_PATTERN_THRESHOLD: usize = 5;

const MAX_RECOMMENDED_PATTERNS: usize = 3;
const MAX_SUMMARY_PATTERNS: usize = 5;

pub const INSIGHT_DRAMATIC: &str =
    "Based on your preferences, you seem to prefer dynamic camera movements with dramatic lighting.";
pub const INSIGHT_FAST_PACED: &str =
    "Your successful patterns suggest you enjoy fast-paced action sequences with quick cuts.";
pub const INSIGHT_HANDHELD: &str =
    "I notice you often choose nighttime scenes with handheld camera work for intense moments.";
pub const INSIGHT_COMPLEX: &str =
    "Your learning shows a preference for complex, multi-character action sequences.";
pub const INSIGHT_DEFAULT: &str =
    "Based on your history, you might enjoy experimenting with more dolly shots for smoother movement.";

/// Key with the highest weight. Ties go to the key that sorts first.
pub fn top_preference<K: Copy + Default + Ord>(weights: &BTreeMap<K, u64>) -> K {
    let mut best: Option<(K, u64)> = None;
    for (key, weight) in weights {
        match best {
            Some((_, top)) if *weight <= top => {}
            _ => best = Some((*key, *weight)),
        }
    }
    best.map(|(key, _)| key).unwrap_or_default()
}

fn seeded<K: Copy + Ord>(options: &[K]) -> BTreeMap<K, u64> {
    options.iter().map(|k| (*k, SEED_WEIGHT)).collect()
}

/// Everything the preference model learns for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceState {
    camera: BTreeMap<CameraStyle, u64>,
    lighting: BTreeMap<LightingStyle, u64>,
    /// Insertion order, unique by `pattern`
    patterns: Vec<ActionPattern>,
    complexity: Complexity,
    /// Insertion order, no duplicates
    genres: Vec<String>,
    history: VecDeque<HistoryEntry>,
}

impl Default for PreferenceState {
    fn default() -> Self {
        Self {
            camera: seeded(CameraStyle::ALL),
            lighting: seeded(LightingStyle::ALL),
            patterns: Vec::new(),
            complexity: Complexity::default(),
            genres: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }
}

impl PreferenceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event and append it to the history.
    ///
    /// `context` defaults to the event payload. Nothing is changed when the
    /// event is rejected.
    pub fn record(
        &mut self,
        event: &LearningEvent,
        context: Option<Value>,
        outcome: Outcome,
    ) -> LearningResult<UpdatedPreferences> {
        match event {
            LearningEvent::CameraUsage(usage) => {
                if let Some(name) = usage.camera.as_deref() {
                    self.bump_camera(name, USAGE_WEIGHT);
                }
            }
            LearningEvent::LightingUsage(usage) => {
                if let Some(name) = usage.lighting.as_deref() {
                    self.bump_lighting(name, USAGE_WEIGHT);
                }
            }
            LearningEvent::ActionPattern(usage) => self.record_pattern(usage, outcome)?,
            LearningEvent::SceneRender(render) => self.record_render(render),
            LearningEvent::UserFeedback(feedback) => self.record_feedback(feedback),
        }

        self.history.push_back(HistoryEntry {
            timestamp: Utc::now(),
            action_type: event.kind(),
            context: context.unwrap_or_else(|| event.payload()),
            outcome,
        });
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }

        Ok(self.updated_preferences())
    }

    /// Unknown names are ignored; no new keys are created.
    fn bump_camera(&mut self, name: &str, amount: u64) {
        match name.parse::<CameraStyle>() {
            Ok(style) => *self.camera.entry(style).or_insert(SEED_WEIGHT) += amount,
            Err(_) => warn!(camera = name, "Ignoring unknown camera preference"),
        }
    }

    fn bump_lighting(&mut self, name: &str, amount: u64) {
        match name.parse::<LightingStyle>() {
            Ok(style) => *self.lighting.entry(style).or_insert(SEED_WEIGHT) += amount,
            Err(_) => warn!(lighting = name, "Ignoring unknown lighting preference"),
        }
    }

    fn record_pattern(&mut self, usage: &ActionPatternUsage, outcome: Outcome) -> LearningResult<()> {
        let name = usage.pattern.trim();
        if name.is_empty() {
            return Err(InvalidInput::new("pattern", "pattern is required and must not be empty").into());
        }

        let duration = usage
            .duration
            .filter(|d| *d > 0.0 && d.is_finite())
            .unwrap_or(DEFAULT_NODE_DURATION);
        let success = u32::from(outcome == Outcome::Success);

        match self.patterns.iter_mut().find(|p| p.pattern == name) {
            Some(pattern) => {
                pattern.usage_count += 1;
                pattern.success_count += success;
                pattern.avg_duration = (pattern.avg_duration + duration) / 2.0;
            }
            None => self.patterns.push(ActionPattern {
                pattern: name.to_string(),
                success_count: success,
                usage_count: 1,
                avg_duration: duration,
            }),
        }
        Ok(())
    }

    fn record_render(&mut self, render: &SceneRenderUsage) {
        if let Some(complexity) = render.complexity {
            self.complexity = complexity;
        }
        if let Some(genre) = render.genre.as_deref().filter(|g| !g.is_empty()) {
            if !self.genres.iter().any(|g| g == genre) {
                self.genres.push(genre.to_string());
            }
        }
    }

    fn record_feedback(&mut self, feedback: &UserFeedback) {
        if let Some(name) = feedback.preferred_camera.as_deref() {
            self.bump_camera(name, FEEDBACK_WEIGHT);
        }
        if let Some(name) = feedback.preferred_lighting.as_deref() {
            self.bump_lighting(name, FEEDBACK_WEIGHT);
        }
    }

    pub fn camera_weight(&self, style: CameraStyle) -> u64 {
        self.camera.get(&style).copied().unwrap_or(SEED_WEIGHT)
    }

    pub fn lighting_weight(&self, style: LightingStyle) -> u64 {
        self.lighting.get(&style).copied().unwrap_or(SEED_WEIGHT)
    }

    pub fn pattern(&self, name: &str) -> Option<&ActionPattern> {
        self.patterns.iter().find(|p| p.pattern == name)
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn top_camera(&self) -> CameraStyle {
        top_preference(&self.camera)
    }

    pub fn top_lighting(&self) -> LightingStyle {
        top_preference(&self.lighting)
    }

    /// Patterns above the success threshold, best first. The sort is stable
    /// so equal success counts keep insertion order.
    fn ranked_patterns(&self) -> Vec<&ActionPattern> {
        let mut ranked: Vec<_> = self.patterns.iter().filter(|p| p.is_successful()).collect();
        ranked.sort_by(|a, b| b.success_count.cmp(&a.success_count));
        ranked
    }

    pub fn updated_preferences(&self) -> UpdatedPreferences {
        UpdatedPreferences {
            top_camera: self.top_camera(),
            top_lighting: self.top_lighting(),
            successful_patterns: self
                .patterns
                .iter()
                .filter(|p| p.is_successful())
                .map(|p| p.pattern.clone())
                .collect(),
        }
    }

    pub fn suggestions(&self) -> Suggestions {
        Suggestions {
            camera_suggestion: self.top_camera(),
            lighting_suggestion: self.top_lighting(),
            recommended_patterns: self
                .ranked_patterns()
                .into_iter()
                .take(MAX_RECOMMENDED_PATTERNS)
                .map(|p| p.pattern.clone())
                .collect(),
            complexity_suggestion: self.complexity,
            insight: self.insight().to_string(),
        }
    }

    /// First matching rule wins.
    pub fn insight(&self) -> &'static str {
        if self.camera_weight(CameraStyle::Handheld) > INSIGHT_WEIGHT_THRESHOLD {
            INSIGHT_HANDHELD
        } else if self.lighting_weight(LightingStyle::Dramatic) > INSIGHT_WEIGHT_THRESHOLD {
            INSIGHT_DRAMATIC
        } else if self.complexity == Complexity::Complex {
            INSIGHT_COMPLEX
        } else if self.patterns.len() > INSIGHT_PATTERN_THRESHOLD {
            INSIGHT_FAST_PACED
        } else {
            INSIGHT_DEFAULT
        }
    }

    pub fn summary(&self) -> PreferenceSummary {
        PreferenceSummary {
            camera: self.camera.clone(),
            lighting: self.lighting.clone(),
            complexity: self.complexity,
            genres: self.genres.clone(),
            successful_patterns: self
                .ranked_patterns()
                .into_iter()
                .take(MAX_SUMMARY_PATTERNS)
                .cloned()
                .collect(),
        }
    }

    /// Learning progress in `[0, 100]`.
    pub fn progress(&self) -> f64 {
        let total = self.history.len();
        if total == 0 {
            return 0.0;
        }
        let successful = self
            .history
            .iter()
            .filter(|h| h.outcome == Outcome::Success)
            .count();

        let total = total as f64;
        let score = successful as f64 / total * 100.0 + total / 50.0 * 10.0;
        score.min(100.0)
    }

    /// Name of the pattern with the highest success rate; the earliest wins
    /// ties. `"N/A"` when nothing has been recorded.
    pub fn most_successful_pattern(&self) -> String {
        let mut patterns = self.patterns.iter();
        let Some(first) = patterns.next() else {
            return "N/A".to_string();
        };
        patterns
            .fold(first, |best, current| {
                if current.success_rate() > best.success_rate() {
                    current
                } else {
                    best
                }
            })
            .pattern
            .clone()
    }

    pub fn stats(&self) -> LearningStats {
        LearningStats {
            total_learning_events: self.history.len(),
            top_camera: self.top_camera(),
            top_lighting: self.top_lighting(),
            preferred_complexity: self.complexity,
            most_successful_pattern: self.most_successful_pattern(),
            learning_progress: self.progress(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(state: &mut PreferenceState, event: LearningEvent, outcome: Outcome) {
        state.record(&event, None, outcome).unwrap();
    }

    #[test]
    fn test_seeded_weights() {
        let state = PreferenceState::new();
        for style in CameraStyle::ALL {
            assert_eq!(state.camera_weight(*style), SEED_WEIGHT);
        }
        for style in LightingStyle::ALL {
            assert_eq!(state.lighting_weight(*style), SEED_WEIGHT);
        }
        assert_eq!(state.top_camera(), CameraStyle::Static);
        assert_eq!(state.top_lighting(), LightingStyle::Daylight);
    }

    #[test]
    fn test_camera_usage_increments_only_named_key() {
        let mut state = PreferenceState::new();
        for _ in 0..3 {
            record(&mut state, LearningEvent::camera_usage("Pan"), Outcome::Neutral);
        }

        assert_eq!(state.camera_weight(CameraStyle::Pan), SEED_WEIGHT + 3);
        for style in CameraStyle::ALL.iter().filter(|s| **s != CameraStyle::Pan) {
            assert_eq!(state.camera_weight(*style), SEED_WEIGHT);
        }
        assert_eq!(state.top_camera(), CameraStyle::Pan);
    }

    #[test]
    fn test_unknown_names_are_ignored_but_logged_to_history() {
        let mut state = PreferenceState::new();
        record(&mut state, LearningEvent::camera_usage("Crane"), Outcome::Neutral);
        record(&mut state, LearningEvent::lighting_usage("Strobe"), Outcome::Neutral);
        record(
            &mut state,
            LearningEvent::user_feedback(Some("Crane".into()), Some("Strobe".into())),
            Outcome::Neutral,
        );

        assert_eq!(state.summary().camera, PreferenceState::new().summary().camera);
        assert_eq!(state.summary().lighting, PreferenceState::new().summary().lighting);
        assert_eq!(state.history_len(), 3);
    }

    #[test]
    fn test_user_feedback_adds_double_weight() {
        let mut state = PreferenceState::new();
        record(
            &mut state,
            LearningEvent::user_feedback(Some("Dolly".into()), Some("Neon".into())),
            Outcome::Success,
        );
        assert_eq!(state.camera_weight(CameraStyle::Dolly), SEED_WEIGHT + FEEDBACK_WEIGHT);
        assert_eq!(state.lighting_weight(LightingStyle::Neon), SEED_WEIGHT + FEEDBACK_WEIGHT);
    }

    #[test]
    fn test_action_pattern_smoothing() {
        let mut state = PreferenceState::new();
        record(&mut state, LearningEvent::action_pattern("punch", Some(3.0)), Outcome::Success);
        record(&mut state, LearningEvent::action_pattern("punch", Some(5.0)), Outcome::Failure);

        let pattern = state.pattern("punch").unwrap();
        assert_eq!(pattern.usage_count, 2);
        assert_eq!(pattern.success_count, 1);
        assert_eq!(pattern.avg_duration, 4.0);
    }

    #[test]
    fn test_action_pattern_missing_duration_defaults_to_two() {
        let mut state = PreferenceState::new();
        record(&mut state, LearningEvent::action_pattern("kick", None), Outcome::Neutral);
        record(&mut state, LearningEvent::action_pattern("kick", Some(6.0)), Outcome::Neutral);
        assert_eq!(state.pattern("kick").unwrap().avg_duration, 4.0);
        assert_eq!(state.pattern("kick").unwrap().success_count, 0);
    }

    #[test]
    fn test_blank_pattern_is_rejected_without_side_effects() {
        let mut state = PreferenceState::new();
        let before = state.clone();
        let result = state.record(&LearningEvent::action_pattern("  ", None), None, Outcome::Success);
        assert!(result.is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_scene_render_overwrites_complexity_and_dedups_genres() {
        let mut state = PreferenceState::new();
        record(
            &mut state,
            LearningEvent::scene_render(Some(Complexity::Complex), Some("wuxia".into())),
            Outcome::Neutral,
        );
        record(&mut state, LearningEvent::scene_render(None, Some("wuxia".into())), Outcome::Neutral);
        record(&mut state, LearningEvent::scene_render(None, Some("noir".into())), Outcome::Neutral);

        let summary = state.summary();
        assert_eq!(summary.complexity, Complexity::Complex);
        assert_eq!(summary.genres, vec!["wuxia".to_string(), "noir".to_string()]);
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let mut state = PreferenceState::new();
        for i in 0..(HISTORY_CAPACITY + 1) {
            state
                .record(&LearningEvent::camera_usage("Pan"), Some(json!({ "i": i })), Outcome::Neutral)
                .unwrap();
        }

        assert_eq!(state.history_len(), HISTORY_CAPACITY);
        let indices: Vec<u64> = state
            .history()
            .map(|h| h.context["i"].as_u64().unwrap())
            .collect();
        let expected: Vec<u64> = (1..=HISTORY_CAPACITY as u64).collect();
        assert_eq!(indices, expected);
    }

    #[test]
    fn test_history_context_defaults_to_payload() {
        let mut state = PreferenceState::new();
        record(&mut state, LearningEvent::camera_usage("Track"), Outcome::Neutral);
        let entry = state.history().next().unwrap();
        assert_eq!(entry.context, json!({ "camera": "Track" }));
        assert_eq!(entry.outcome, Outcome::Neutral);
    }

    #[test]
    fn test_recommended_patterns_threshold_and_order() {
        let mut state = PreferenceState::new();
        // "feint": 1/1, "sweep": 3/3, "grab": 1/2, "throw": 2/2, "roll": 3/4
        let plays: &[(&str, &[Outcome])] = &[
            ("feint", &[Outcome::Success]),
            ("sweep", &[Outcome::Success, Outcome::Success, Outcome::Success]),
            ("grab", &[Outcome::Success, Outcome::Failure]),
            ("throw", &[Outcome::Success, Outcome::Success]),
            (
                "roll",
                &[Outcome::Success, Outcome::Success, Outcome::Success, Outcome::Failure],
            ),
        ];
        for (name, outcomes) in plays {
            for outcome in *outcomes {
                record(&mut state, LearningEvent::action_pattern(*name, None), *outcome);
            }
        }

        let suggestions = state.suggestions();
        assert_eq!(suggestions.recommended_patterns, vec!["sweep", "roll", "throw"]);
        for name in &suggestions.recommended_patterns {
            assert!(state.pattern(name).unwrap().success_rate() > 0.7);
        }

        let summary = state.summary();
        let names: Vec<_> = summary.successful_patterns.iter().map(|p| p.pattern.as_str()).collect();
        assert_eq!(names, vec!["sweep", "roll", "throw", "feint"]);

        assert_eq!(
            state.updated_preferences().successful_patterns,
            vec!["feint", "sweep", "throw", "roll"]
        );
    }

    #[test]
    fn test_insight_priority() {
        let mut state = PreferenceState::new();
        assert_eq!(state.insight(), INSIGHT_DEFAULT);

        record(&mut state, LearningEvent::scene_render(Some(Complexity::Complex), None), Outcome::Neutral);
        assert_eq!(state.insight(), INSIGHT_COMPLEX);

        for _ in 0..3 {
            record(&mut state, LearningEvent::lighting_usage("Dramatic"), Outcome::Neutral);
        }
        assert_eq!(state.insight(), INSIGHT_DRAMATIC);

        for _ in 0..3 {
            record(&mut state, LearningEvent::camera_usage("Handheld"), Outcome::Neutral);
        }
        assert_eq!(state.insight(), INSIGHT_HANDHELD);
    }

    #[test]
    fn test_insight_for_many_patterns() {
        let mut state = PreferenceState::new();
        for i in 0..6 {
            record(&mut state, LearningEvent::action_pattern(format!("p{i}"), None), Outcome::Neutral);
        }
        assert_eq!(state.insight(), INSIGHT_FAST_PACED);
    }

    #[test]
    fn test_progress() {
        let mut state = PreferenceState::new();
        assert_eq!(state.progress(), 0.0);

        record(&mut state, LearningEvent::camera_usage("Pan"), Outcome::Success);
        record(&mut state, LearningEvent::camera_usage("Pan"), Outcome::Failure);
        // 1/2 * 100 + 2/50 * 10
        assert!((state.progress() - 50.4).abs() < 1e-9);

        for _ in 0..500 {
            record(&mut state, LearningEvent::camera_usage("Pan"), Outcome::Success);
        }
        assert_eq!(state.progress(), 100.0);
    }

    #[test]
    fn test_stats() {
        let mut state = PreferenceState::new();
        assert_eq!(state.stats().most_successful_pattern, "N/A");

        record(&mut state, LearningEvent::action_pattern("jab", None), Outcome::Failure);
        record(&mut state, LearningEvent::action_pattern("hook", None), Outcome::Success);
        record(&mut state, LearningEvent::action_pattern("cross", None), Outcome::Success);

        let stats = state.stats();
        assert_eq!(stats.total_learning_events, 3);
        assert_eq!(stats.most_successful_pattern, "hook");
        assert_eq!(stats.preferred_complexity, Complexity::Medium);
    }

    #[test]
    fn test_top_preference_ties_go_to_first_key() {
        let mut weights = BTreeMap::new();
        weights.insert(CameraStyle::Track, 4);
        weights.insert(CameraStyle::Pan, 4);
        weights.insert(CameraStyle::Static, 1);
        assert_eq!(top_preference(&weights), CameraStyle::Pan);
        assert_eq!(top_preference::<CameraStyle>(&BTreeMap::new()), CameraStyle::Static);
    }
}
