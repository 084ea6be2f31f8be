//! Online preference learning.
//!
//! A [`PreferenceModel`] accumulates weighted camera/lighting choices, action
//! pattern success statistics, a complexity preference and preferred genres,
//! plus a bounded rolling history of the events it has seen. It answers
//! suggestion, summary and progress queries from that state.

pub mod error;
pub mod model;
pub mod state;

pub use error::{LearningError, LearningResult};
pub use model::{parse_event, PreferenceModel};
pub use state::{top_preference, PreferenceState};
