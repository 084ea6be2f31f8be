//! Application state.

use std::sync::Arc;

use choreo_vendor::{Deployment, JobPoller, PortraitClient, SceneAnalyzer, VendorConfig, VendorResult};

use crate::config::ApiConfig;
use crate::session::SessionRegistry;

/// Vendor clients sharing one HTTP connection pool.
pub struct VendorServices {
    pub config: VendorConfig,
    pub video: JobPoller,
    pub stitch: JobPoller,
    pub style_transfer: JobPoller,
    pub fusionx: JobPoller,
    pub analyzer: SceneAnalyzer,
    pub portraits: PortraitClient,
}

impl VendorServices {
    pub fn new(config: VendorConfig) -> VendorResult<Self> {
        let http = config.http_client()?;

        Ok(Self {
            video: JobPoller::new(http.clone(), &config, Deployment::VideoGenerate),
            stitch: JobPoller::new(http.clone(), &config, Deployment::Stitch),
            style_transfer: JobPoller::new(http.clone(), &config, Deployment::StyleTransfer),
            fusionx: JobPoller::new(http.clone(), &config, Deployment::FusionX),
            analyzer: SceneAnalyzer::new(http.clone(), config.ai.clone()),
            portraits: PortraitClient::new(http, config.ai.clone()),
            config,
        })
    }

    pub fn poller(&self, deployment: Deployment) -> &JobPoller {
        match deployment {
            Deployment::VideoGenerate => &self.video,
            Deployment::Stitch => &self.stitch,
            Deployment::StyleTransfer => &self.style_transfer,
            Deployment::FusionX => &self.fusionx,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub sessions: Arc<SessionRegistry>,
    pub vendor: Arc<VendorServices>,
}

impl AppState {
    pub fn new(config: ApiConfig, vendor_config: VendorConfig) -> VendorResult<Self> {
        let sessions = Arc::new(SessionRegistry::new(config.max_sessions, config.session_ttl));
        let vendor = Arc::new(VendorServices::new(vendor_config)?);

        Ok(Self {
            config: Arc::new(config),
            sessions,
            vendor,
        })
    }
}
