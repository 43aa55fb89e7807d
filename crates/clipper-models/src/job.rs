//! Job identifiers and endpoint response bodies.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message shown when a successful submission carries no usable job.
pub const MISSING_PROCESS_ID: &str = "No process ID received from server";

/// Server-issued identifier of one clip job (`processId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 2xx body of the submission endpoint: `{status: "started", processId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "processId", default)]
    pub process_id: Option<String>,
}

impl SubmitResponse {
    pub const STARTED: &'static str = "started";

    /// Extract the job id.
    ///
    /// A missing `status` is tolerated (some deployments omit it); any other
    /// status, or a missing/blank `processId`, is a protocol error.
    pub fn into_job_id(self) -> Result<JobId, &'static str> {
        if let Some(status) = self.status.as_deref() {
            if status != Self::STARTED {
                return Err(MISSING_PROCESS_ID);
            }
        }

        match self.process_id {
            Some(id) if !id.trim().is_empty() => Ok(JobId(id)),
            _ => Err(MISSING_PROCESS_ID),
        }
    }
}

/// Optional JSON body of a non-2xx response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Remaining credits for this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditsInfo {
    pub credits_left: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<DateTime<Utc>>,
}

/// Client identity sent as `X-Client-FP`: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFingerprint(String);

impl ClientFingerprint {
    pub const LEN: usize = 64;

    /// Generate a random fingerprint.
    pub fn generate() -> Self {
        Self(format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()))
    }

    /// Accept a configured fingerprint if it has the expected shape.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let valid = value.len() == Self::LEN && value.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
