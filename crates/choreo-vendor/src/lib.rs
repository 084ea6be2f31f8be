//! Clients for the external generation vendors.
//!
//! - [`JobPoller`]: submit/poll for deployment-based video jobs
//! - [`SceneAnalyzer`]: chat-completion scene breakdowns
//! - [`PortraitClient`]: text-to-image character portraits

pub mod analysis;
pub mod config;
pub mod deployments;
pub mod error;
pub mod poller;
pub mod portrait;
pub mod retry;

pub use analysis::SceneAnalyzer;
pub use config::{AiConfig, VendorConfig};
pub use deployments::{
    Deployment, FusionXRequest, StitchRequest, StyleTransferRequest, VideoClip, VideoGenerateRequest,
    MAX_OUTPUT_DURATION,
};
pub use error::{VendorError, VendorResult};
pub use poller::{JobPoller, PollOptions, PollOutcome};
pub use portrait::PortraitClient;
pub use retry::{retry_async, RetryConfig};
