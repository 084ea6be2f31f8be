//! Vendor job status as seen by the poller.
//!
//! A generation job moves `Submitted -> Polling -> {Completed, Failed, TimedOut}`.
//! Vendors report only `processing | completed | failed`; the remaining states
//! are tracked locally.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque vendor-issued job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status reported by the vendor for a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Normalize a vendor status string. Unknown values count as in progress.
    pub fn from_vendor(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "completed" | "complete" | "succeeded" | "success" | "done" => JobStatus::Completed,
            "failed" | "failure" | "error" | "cancelled" | "canceled" => JobStatus::Failed,
            _ => JobStatus::Processing,
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local lifecycle of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::TimedOut)
    }

    /// Transition after observing a vendor status. Terminal states are sticky.
    pub fn observe(self, status: JobStatus) -> Self {
        if self.is_terminal() {
            return self;
        }
        match status {
            JobStatus::Processing => JobState::Polling,
            JobStatus::Completed => JobState::Completed,
            JobStatus::Failed => JobState::Failed,
        }
    }

    pub fn time_out(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            JobState::TimedOut
        }
    }
}

/// Result of one status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    /// 0-100; 0 when the vendor omits it
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Status endpoint that answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl JobSnapshot {
    /// Build from a raw vendor status payload.
    pub fn from_vendor_payload(job_id: JobId, payload: &Value) -> Self {
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .map(JobStatus::from_vendor)
            .unwrap_or_default();

        let progress = payload
            .get("progress")
            .and_then(Value::as_f64)
            .map(|p| p.clamp(0.0, 100.0).round() as u8)
            .unwrap_or(0);

        let result = payload.get("result").filter(|r| !r.is_null()).cloned();

        Self {
            job_id,
            status,
            progress,
            result,
            endpoint: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
