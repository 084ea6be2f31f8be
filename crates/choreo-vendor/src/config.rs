//! Vendor configuration.
//!
//! Missing credentials never fail startup. They surface per request as
//! [`VendorError::Configuration`].

use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::deployments::Deployment;
use crate::error::{VendorError, VendorResult};

pub const RUNCOMFY_KEY_PLACEHOLDER: &str = "your_runcomfy_api_key_here";
pub const AI_KEY_PLACEHOLDER: &str = "your_zai_api_key_here";

pub const DEFAULT_COMFYUI_BASE_URL: &str = "https://api.runcomfy.net/prod/v1";
pub const DEFAULT_AI_BASE_URL: &str = "https://api.z.ai/api/paas/v4";
pub const DEFAULT_AI_CHAT_MODEL: &str = "glm-4.5";
pub const DEFAULT_AI_IMAGE_MODEL: &str = "cogview-4";

/// Status endpoint templates, tried in order.
pub const DEFAULT_STATUS_ENDPOINTS: &[&str] = &[
    "{base_url}/jobs/{job_id}",
    "{base_url}/deployments/{deployment_id}/jobs/{job_id}",
];

/// Treat empty values and known placeholders as absent.
fn credential(value: Option<String>, placeholder: &str) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != placeholder)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Base URL without a trailing slash; falls back to `default` when unparseable.
fn base_url(key: &str, default: &str) -> String {
    match env_opt(key) {
        Some(raw) => match Url::parse(raw.trim()) {
            Ok(_) => raw.trim().trim_end_matches('/').to_string(),
            Err(e) => {
                warn!(key, error = %e, "Invalid base URL, using default");
                default.to_string()
            }
        },
        None => default.to_string(),
    }
}

/// Text/image generation service used for scene analysis and portraits.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            chat_model: DEFAULT_AI_CHAT_MODEL.to_string(),
            image_model: DEFAULT_AI_IMAGE_MODEL.to_string(),
        }
    }
}

impl AiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: credential(std::env::var("AI_API_KEY").ok(), AI_KEY_PLACEHOLDER),
            base_url: base_url("AI_BASE_URL", DEFAULT_AI_BASE_URL),
            chat_model: env_opt("AI_CHAT_MODEL").unwrap_or_else(|| DEFAULT_AI_CHAT_MODEL.to_string()),
            image_model: env_opt("AI_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_AI_IMAGE_MODEL.to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn require_api_key(&self) -> VendorResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            VendorError::configuration("API key not configured. Please set AI_API_KEY environment variable.")
        })
    }
}

/// Job-based media generation vendor.
#[derive(Debug, Clone)]
pub struct VendorConfig {
    pub runcomfy_api_key: Option<String>,
    pub base_url: String,
    pub video_deployment_id: Option<String>,
    pub framepack_deployment_id: Option<String>,
    pub style_transfer_deployment_id: Option<String>,
    pub fusionx_deployment_id: Option<String>,
    /// Ordered URL templates with `{base_url}`, `{deployment_id}` and `{job_id}`
    pub status_endpoints: Vec<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries for submissions (not including the first attempt)
    pub max_retries: u32,
    pub ai: AiConfig,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            runcomfy_api_key: None,
            base_url: DEFAULT_COMFYUI_BASE_URL.to_string(),
            video_deployment_id: None,
            framepack_deployment_id: None,
            style_transfer_deployment_id: None,
            fusionx_deployment_id: None,
            status_endpoints: DEFAULT_STATUS_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            ai: AiConfig::default(),
        }
    }
}

impl VendorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            runcomfy_api_key: credential(
                std::env::var("RUNCOMFY_API_KEY").ok(),
                RUNCOMFY_KEY_PLACEHOLDER,
            ),
            base_url: base_url("COMFYUI_BASE_URL", DEFAULT_COMFYUI_BASE_URL),
            video_deployment_id: env_opt("VIDEO_DEPLOYMENT_ID"),
            framepack_deployment_id: env_opt("FRAMEPACK_DEPLOYMENT_ID"),
            style_transfer_deployment_id: env_opt("STYLE_TRANSFER_DEPLOYMENT_ID"),
            fusionx_deployment_id: env_opt("FUSIONX_DEPLOYMENT_ID"),
            status_endpoints: env_opt("JOB_STATUS_ENDPOINTS")
                .map(|s| {
                    s.split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.status_endpoints),
            timeout: Duration::from_secs(
                env_opt("VENDOR_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: env_opt("VENDOR_MAX_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            ai: AiConfig::from_env(),
        }
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn runcomfy_configured(&self) -> bool {
        self.runcomfy_api_key.is_some()
    }

    pub fn deployment_id(&self, deployment: Deployment) -> Option<&str> {
        match deployment {
            Deployment::VideoGenerate => self.video_deployment_id.as_deref(),
            Deployment::Stitch => self.framepack_deployment_id.as_deref(),
            Deployment::StyleTransfer => self.style_transfer_deployment_id.as_deref(),
            Deployment::FusionX => self.fusionx_deployment_id.as_deref(),
        }
    }

    /// Build the shared HTTP client with the configured timeout.
    pub fn http_client(&self) -> VendorResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(VendorError::from)
    }
}
