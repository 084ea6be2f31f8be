//! Job submission and status polling for deployment-based vendors.
//!
//! A job is submitted once and then polled until it reaches a terminal state.
//! Status lookups walk an ordered list of endpoint templates and return the
//! first answer; exhausting the list is reported as
//! [`VendorError::Unavailable`], distinct from a single endpoint failing.

use std::time::Duration;

use metrics::counter;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use choreo_models::{JobId, JobSnapshot, JobState};

use crate::config::VendorConfig;
use crate::deployments::Deployment;
use crate::error::{VendorError, VendorResult};
use crate::retry::{retry_async, FailureTracker, RetryConfig};

const SUBMISSIONS_TOTAL: &str = "choreo_vendor_submissions_total";
const SUBMISSION_ERRORS_TOTAL: &str = "choreo_vendor_submission_errors_total";
const STATUS_FALLBACKS_TOTAL: &str = "choreo_vendor_status_fallbacks_total";

/// Client polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// How a polling loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(JobSnapshot),
    Failed(JobSnapshot),
    /// `max_wait` elapsed; carries the last successful poll
    TimedOut(Option<JobSnapshot>),
    /// The cancel signal fired
    Cancelled(Option<JobSnapshot>),
}

impl PollOutcome {
    /// Local lifecycle state, `None` when cancelled.
    pub fn state(&self) -> Option<JobState> {
        match self {
            PollOutcome::Completed(_) => Some(JobState::Completed),
            PollOutcome::Failed(_) => Some(JobState::Failed),
            PollOutcome::TimedOut(_) => Some(JobState::TimedOut),
            PollOutcome::Cancelled(_) => None,
        }
    }
}

/// Pull the vendor job id from a submission response.
fn extract_job_id(payload: &Value) -> Option<JobId> {
    ["id", "job_id"].iter().find_map(|key| match payload.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(JobId::from(s.trim())),
        Value::Number(n) => Some(JobId::from(n.to_string())),
        _ => None,
    })
}

/// Submits and polls jobs for one deployment.
#[derive(Debug, Clone)]
pub struct JobPoller {
    http: Client,
    deployment: Deployment,
    api_key: Option<String>,
    base_url: String,
    deployment_id: Option<String>,
    status_endpoints: Vec<String>,
    retry: RetryConfig,
}

impl JobPoller {
    pub fn new(http: Client, config: &VendorConfig, deployment: Deployment) -> Self {
        Self {
            http,
            deployment,
            api_key: config.runcomfy_api_key.clone(),
            base_url: config.base_url.clone(),
            deployment_id: config.deployment_id(deployment).map(str::to_string),
            status_endpoints: config.status_endpoints.clone(),
            retry: RetryConfig::new(format!("{deployment} submission"))
                .with_max_retries(config.max_retries),
        }
    }

    /// Target a different deployment id than the configured one.
    pub fn with_deployment_id(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn deployment(&self) -> Deployment {
        self.deployment
    }

    pub fn deployment_id(&self) -> Option<&str> {
        self.deployment_id.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.deployment_id.is_some()
    }

    fn require_api_key(&self) -> VendorResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            VendorError::configuration(
                "API key not configured. Please set RUNCOMFY_API_KEY environment variable.",
            )
        })
    }

    fn require_deployment_id(&self) -> VendorResult<&str> {
        self.deployment_id.as_deref().ok_or_else(|| {
            VendorError::configuration(format!(
                "{} deployment not configured. Please set {} environment variable.",
                self.deployment.display_name(),
                self.deployment.env_var()
            ))
        })
    }

    /// Submit a job with the given `overrides`. Configuration is checked
    /// before any network call; transient failures are retried.
    pub async fn submit(&self, overrides: Value) -> VendorResult<JobId> {
        let api_key = self.require_api_key()?;
        let deployment_id = self.require_deployment_id()?;

        let url = format!(
            "{}/deployments/{}/inference",
            self.base_url,
            urlencoding::encode(deployment_id)
        );
        let body = json!({ "overrides": overrides });

        debug!(deployment = %self.deployment, url = %url, "Submitting vendor job");

        let payload = retry_async(&self.retry, || self.send_submit(&url, api_key, &body))
            .await
            .inspect_err(|_| {
                counter!(SUBMISSION_ERRORS_TOTAL, "deployment" => self.deployment.as_str())
                    .increment(1);
            })?;

        let job_id = extract_job_id(&payload).ok_or_else(|| {
            VendorError::upstream(None, "Vendor accepted the request but returned no job id")
        })?;

        counter!(SUBMISSIONS_TOTAL, "deployment" => self.deployment.as_str()).increment(1);
        info!(deployment = %self.deployment, job_id = %job_id, "Vendor job submitted");

        Ok(job_id)
    }

    async fn send_submit(&self, url: &str, api_key: &str, body: &Value) -> VendorResult<Value> {
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VendorError::upstream(Some(status.as_u16()), message));
        }

        Ok(response.json().await?)
    }

    /// Status URLs for a job in priority order. Templates that need a
    /// deployment id are skipped when none is configured.
    pub fn status_urls(&self, job_id: &JobId) -> Vec<String> {
        let job = urlencoding::encode(job_id.as_str());
        let mut urls: Vec<String> = Vec::with_capacity(self.status_endpoints.len());

        for template in &self.status_endpoints {
            let mut url = template
                .replace("{base_url}", &self.base_url)
                .replace("{job_id}", &job);
            if url.contains("{deployment_id}") {
                match self.deployment_id.as_deref() {
                    Some(id) => url = url.replace("{deployment_id}", &urlencoding::encode(id)),
                    None => continue,
                }
            }
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    /// Fetch the current status of a job. Idempotent.
    pub async fn poll(&self, job_id: &JobId) -> VendorResult<JobSnapshot> {
        let api_key = self.require_api_key()?;
        let urls = self.status_urls(job_id);
        let attempts = urls.len();
        let mut last_error = None;

        for (i, url) in urls.into_iter().enumerate() {
            match self.fetch_status(&url, api_key, job_id).await {
                Ok(payload) => {
                    let mut snapshot = JobSnapshot::from_vendor_payload(job_id.clone(), &payload);
                    snapshot.endpoint = Some(url);
                    return Ok(snapshot);
                }
                Err(e) => {
                    debug!(job_id = %job_id, url = %url, error = %e, "Status endpoint failed");
                    if i + 1 < attempts {
                        counter!(STATUS_FALLBACKS_TOTAL, "deployment" => self.deployment.as_str())
                            .increment(1);
                    }
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if attempts == 1 => Err(e),
            Some(e) => {
                warn!(job_id = %job_id, attempts, "All job status endpoints failed");
                Err(VendorError::Unavailable {
                    attempts,
                    last_error: e.to_string(),
                })
            }
            None => Err(self.require_deployment_id().err().unwrap_or_else(|| {
                VendorError::configuration("No job status endpoints configured")
            })),
        }
    }

    async fn fetch_status(&self, url: &str, api_key: &str, job_id: &JobId) -> VendorResult<Value> {
        let response = self.http.get(url).header(AUTHORIZATION, api_key).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VendorError::not_found(format!("job {job_id}")));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VendorError::upstream(Some(status.as_u16()), message));
        }

        Ok(response.json().await?)
    }

    /// Poll on a fixed interval until the job finishes, `max_wait` elapses,
    /// or `cancel` becomes true. Cancellation also interrupts an in-flight
    /// status request.
    ///
    /// Transient poll failures are logged and polling continues. Cancellation
    /// is not an error.
    pub async fn poll_until_terminal(
        &self,
        job_id: &JobId,
        options: PollOptions,
        mut cancel: watch::Receiver<bool>,
    ) -> VendorResult<PollOutcome> {
        let deadline = Instant::now() + options.max_wait;
        let mut state = JobState::Submitted;
        let mut last: Option<JobSnapshot> = None;
        let mut failures = FailureTracker::new(3);

        loop {
            if *cancel.borrow() {
                info!(job_id = %job_id, "Polling cancelled");
                return Ok(PollOutcome::Cancelled(last));
            }

            let poll = self.poll(job_id);
            tokio::pin!(poll);
            let polled = loop {
                tokio::select! {
                    result = &mut poll => break result,
                    changed = cancel.changed() => {
                        if changed.is_err() {
                            break (&mut poll).await;
                        }
                        if *cancel.borrow() {
                            info!(job_id = %job_id, "Polling cancelled during status request");
                            return Ok(PollOutcome::Cancelled(last));
                        }
                    }
                }
            };

            match polled {
                Ok(snapshot) => {
                    failures.record_success();
                    state = state.observe(snapshot.status);
                    debug!(job_id = %job_id, ?state, progress = snapshot.progress, "Polled job");
                    match state {
                        JobState::Completed => return Ok(PollOutcome::Completed(snapshot)),
                        JobState::Failed => return Ok(PollOutcome::Failed(snapshot)),
                        _ => last = Some(snapshot),
                    }
                }
                Err(e) if e.is_retryable() || matches!(e, VendorError::Unavailable { .. }) => {
                    if failures.record_failure() {
                        warn!(job_id = %job_id, error = %e, "Job poll failed, will retry");
                    }
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                state = state.time_out();
                info!(job_id = %job_id, ?state, "Polling timed out");
                return Ok(PollOutcome::TimedOut(last));
            }
            let pause = options.interval.min(deadline - now);

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = cancel.changed() => {
                    // Sender gone: nobody can cancel any more, keep the cadence.
                    if changed.is_err() {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }
    }
}
