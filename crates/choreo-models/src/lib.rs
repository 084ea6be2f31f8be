//! Shared data models for the Choreo action studio.
//!
//! This crate provides Serde-serializable types for:
//! - Storyboard nodes and their drafts/patches
//! - Camera and lighting option sets
//! - Characters
//! - Preference-learning events and derived views
//! - Scene-analysis results
//! - Vendor job status

pub mod analysis;
pub mod character;
pub mod job_status;
pub mod learning;
pub mod node;
pub mod style;
pub mod validation;

// Re-export common types
pub use analysis::{ActionAnalysis, ParsedAction, SceneAnalysis};
pub use character::{Character, CharacterRequest};
pub use job_status::{JobId, JobSnapshot, JobState, JobStatus};
pub use learning::{
    ActionPattern, ActionPatternUsage, CameraUsage, Complexity, HistoryEntry, LearningEvent,
    LearningEventKind, LearningStats, LightingUsage, Outcome, PreferenceSummary,
    SceneRenderUsage, Suggestions, UpdatedPreferences, UserFeedback, HISTORY_CAPACITY,
    SUCCESS_RATIO_THRESHOLD,
};
pub use node::{NodeDraft, NodeId, NodePatch, SceneNode, DEFAULT_NODE_DURATION};
pub use style::{CameraStyle, LightingStyle, StyleParseError};
pub use validation::InvalidInput;
