//! Storyboard node store and action-sequence ingestion.

pub mod error;
pub mod ingestion;
pub mod store;

pub use error::{StoryboardError, StoryboardResult};
pub use ingestion::{
    parse_mentions, IngestionFailure, IngestionReport, Mention, NodeDefaults, SequenceIngestion,
};
pub use store::StoryboardStore;
