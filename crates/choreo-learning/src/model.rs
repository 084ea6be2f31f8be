//! Shared, concurrency-safe preference model.

use std::str::FromStr;

use metrics::counter;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use choreo_models::{
    LearningEvent, LearningEventKind, LearningStats, Outcome, PreferenceSummary, Suggestions,
    UpdatedPreferences,
};

use crate::error::{LearningError, LearningResult};
use crate::state::PreferenceState;

const LEARNING_EVENTS_TOTAL: &str = "choreo_learning_events_total";

/// Decode an untyped `{type, data}` pair into a typed event.
pub fn parse_event(kind: &str, data: Value) -> LearningResult<LearningEvent> {
    let kind = LearningEventKind::from_str(kind)
        .map_err(|_| LearningError::UnknownKind(kind.to_string()))?;
    LearningEvent::from_parts(kind, data)
        .map_err(|e| LearningError::invalid_payload(kind.as_str(), e.to_string()))
}

/// Preference model guarded by a single lock. Each call observes and
/// mutates the state atomically.
#[derive(Debug, Default)]
pub struct PreferenceModel {
    state: RwLock<PreferenceState>,
}

impl PreferenceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_event(
        &self,
        event: LearningEvent,
        context: Option<Value>,
        outcome: Option<Outcome>,
    ) -> LearningResult<UpdatedPreferences> {
        let kind = event.kind();
        let updated = self
            .state
            .write()
            .await
            .record(&event, context, outcome.unwrap_or_default())?;

        counter!(LEARNING_EVENTS_TOTAL, "kind" => kind.as_str()).increment(1);
        debug!(kind = %kind, "Recorded learning event");

        Ok(updated)
    }

    pub async fn suggestions(&self) -> Suggestions {
        self.state.read().await.suggestions()
    }

    pub async fn summary(&self) -> PreferenceSummary {
        self.state.read().await.summary()
    }

    pub async fn stats(&self) -> LearningStats {
        self.state.read().await.stats()
    }

    pub async fn progress(&self) -> f64 {
        self.state.read().await.progress()
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> PreferenceState {
        self.state.read().await.clone()
    }
}
