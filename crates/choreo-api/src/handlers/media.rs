//! Job proxies for the deployment-based video vendors.
//!
//! Each service has a `POST` that submits a job and a `GET ?job_id=` that
//! reports its status. Polling never mutates anything on our side.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::info;

use choreo_models::{JobId, JobSnapshot};
use choreo_vendor::{
    Deployment, FusionXRequest, JobPoller, PollOptions, PollOutcome, StitchRequest,
    StyleTransferRequest, VideoGenerateRequest,
};

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Upper bound for `wait_secs` long-polling.
const MAX_WAIT_SECS: u64 = 25;
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Submission response.
#[derive(Serialize)]
pub struct JobSubmittedResponse {
    pub success: bool,
    pub job_id: JobId,
    pub deployment_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl JobSubmittedResponse {
    pub(crate) fn new(job_id: JobId, deployment_id: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            job_id,
            deployment_id: deployment_id.to_string(),
            message: message.into(),
            estimated_duration: None,
            extra: serde_json::Map::new(),
        }
    }

    pub(crate) fn with_estimate(mut self, seconds: f64) -> Self {
        self.estimated_duration = Some(seconds);
        self
    }

    pub(crate) fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Status query.
#[derive(Debug, Default, Deserialize)]
pub struct JobStatusQuery {
    pub job_id: Option<String>,
    /// Long-poll for up to this many seconds, returning early once the job
    /// finishes.
    pub wait_secs: Option<u64>,
}

/// Status response.
#[derive(Serialize)]
pub struct JobStatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub snapshot: JobSnapshot,
}

/// Submit through `poller`, counting setup failures.
pub(crate) async fn submit_job(poller: &JobPoller, overrides: Value) -> ApiResult<JobId> {
    poller.submit(overrides).await.map_err(|e| {
        if e.is_setup_required() {
            metrics::record_setup_required(poller.deployment().as_str());
        }
        ApiError::from(e)
    })
}

/// Poll a job once, or until it finishes when `wait_secs` is set.
pub(crate) async fn job_status(poller: &JobPoller, query: JobStatusQuery) -> ApiResult<JobStatusResponse> {
    let job_id = query
        .job_id
        .filter(|id| !id.trim().is_empty())
        .map(|id| JobId::from(id.trim()))
        .ok_or_else(|| ApiError::bad_request("Job ID is required"))?;

    let wait = query.wait_secs.unwrap_or(0).min(MAX_WAIT_SECS);

    let snapshot = if wait == 0 {
        poller.poll(&job_id).await
    } else {
        // Dropping the request future stops the loop; the sender only has to outlive it.
        let (_cancel, cancel_rx) = watch::channel(false);
        let options = PollOptions {
            interval: WAIT_POLL_INTERVAL,
            max_wait: Duration::from_secs(wait),
        };
        match poller.poll_until_terminal(&job_id, options, cancel_rx).await {
            Ok(
                PollOutcome::Completed(s)
                | PollOutcome::Failed(s)
                | PollOutcome::TimedOut(Some(s))
                | PollOutcome::Cancelled(Some(s)),
            ) => Ok(s),
            Ok(PollOutcome::TimedOut(None) | PollOutcome::Cancelled(None)) => poller.poll(&job_id).await,
            Err(e) => Err(e),
        }
    };

    let snapshot = snapshot.map_err(|e| {
        if e.is_setup_required() {
            metrics::record_setup_required(poller.deployment().as_str());
        }
        ApiError::from(e)
    })?;

    Ok(JobStatusResponse {
        success: true,
        snapshot,
    })
}

fn deployment_id_of(poller: &JobPoller) -> &str {
    poller.deployment_id().unwrap_or_default()
}

/// `POST /api/video/generate`
pub async fn generate_video(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VideoGenerateRequest>,
) -> ApiResult<Json<JobSubmittedResponse>> {
    request.validate_request()?;

    let poller = match request.deployment_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => state.vendor.video.clone().with_deployment_id(id),
        _ => state.vendor.video.clone(),
    };

    let job_id = submit_job(&poller, request.overrides()).await?;
    info!(job_id = %job_id, workflow = request.workflow_type(), "Video generation started");

    Ok(Json(
        JobSubmittedResponse::new(job_id, deployment_id_of(&poller), "Video generation started successfully")
            .with_estimate(request.estimated_duration() as f64)
            .with_field("prompt", request.prompt.clone())
            .with_field("workflow_type", request.workflow_type()),
    ))
}

/// `GET /api/video/generate?job_id=`
pub async fn video_status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<JobStatusQuery>,
) -> ApiResult<Json<JobStatusResponse>> {
    job_status(state.vendor.poller(Deployment::VideoGenerate), query)
        .await
        .map(Json)
}

/// `POST /api/video/fusionx`
pub async fn fusionx_video(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FusionXRequest>,
) -> ApiResult<Json<JobSubmittedResponse>> {
    request.validate_request()?;

    let poller = state.vendor.poller(Deployment::FusionX);
    let job_id = submit_job(poller, request.overrides()).await?;
    info!(job_id = %job_id, frames = request.num_frames(), "FusionX generation started");

    Ok(Json(
        JobSubmittedResponse::new(job_id, deployment_id_of(poller), "Video generation started")
            .with_estimate(request.clip_duration())
            .with_field("prompt", request.prompt.clone()),
    ))
}

/// `GET /api/video/fusionx?job_id=`
pub async fn fusionx_status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<JobStatusQuery>,
) -> ApiResult<Json<JobStatusResponse>> {
    job_status(state.vendor.poller(Deployment::FusionX), query)
        .await
        .map(Json)
}

/// `POST /api/video/stitch`
pub async fn stitch_video(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StitchRequest>,
) -> ApiResult<Json<JobSubmittedResponse>> {
    request.validate_request()?;

    let poller = state.vendor.poller(Deployment::Stitch);
    let job_id = submit_job(poller, request.overrides()).await?;
    info!(job_id = %job_id, clips = request.video_clips.len(), "Video stitching started");

    Ok(Json(
        JobSubmittedResponse::new(job_id, deployment_id_of(poller), "Video stitching started")
            .with_estimate(request.output_duration())
            .with_field("clip_count", request.video_clips.len()),
    ))
}

/// `GET /api/video/stitch?job_id=`
pub async fn stitch_status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<JobStatusQuery>,
) -> ApiResult<Json<JobStatusResponse>> {
    job_status(state.vendor.poller(Deployment::Stitch), query)
        .await
        .map(Json)
}

/// `POST /api/style-transfer`
pub async fn style_transfer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StyleTransferRequest>,
) -> ApiResult<Json<JobSubmittedResponse>> {
    request.validate_request()?;

    let poller = state.vendor.poller(Deployment::StyleTransfer);
    let job_id = submit_job(poller, request.overrides()).await?;
    info!(job_id = %job_id, "Style transfer started");

    Ok(Json(
        JobSubmittedResponse::new(job_id, deployment_id_of(poller), "Style transfer started")
            .with_field("video_url", request.video_url.clone()),
    ))
}

/// `GET /api/style-transfer?job_id=`
pub async fn style_transfer_status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<JobStatusQuery>,
) -> ApiResult<Json<JobStatusResponse>> {
    job_status(state.vendor.poller(Deployment::StyleTransfer), query)
        .await
        .map(Json)
}
