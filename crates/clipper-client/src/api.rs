//! Server endpoints used by the job client.

use std::path::PathBuf;

use async_trait::async_trait;
use clipper_models::{ClipRequest, CreditsInfo, JobId};

use crate::error::ClientResult;
use crate::sse::EventStream;

/// Header carrying the client fingerprint.
pub const FINGERPRINT_HEADER: &str = "X-Client-FP";

/// Header carrying the rate-limit window reset (unix seconds).
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Filename used when neither the server nor the URL suggest one.
pub const DEFAULT_CLIP_FILENAME: &str = "video_clip.mp4";

/// Job service operations.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Submit a validated request and return the server's job id.
    async fn submit(&self, request: &ClipRequest) -> ClientResult<JobId>;

    /// Open the progress stream for a job.
    async fn open_progress(&self, job: &JobId) -> ClientResult<EventStream>;

    /// Ask the server to stop working on a job.
    async fn cancel(&self, job: &JobId, reason: &str) -> ClientResult<()>;

    /// Remaining credits for this client.
    async fn credits(&self) -> ClientResult<CreditsInfo>;

    /// Fetch a finished clip and return where it was saved.
    async fn download(&self, url: &str, filename: Option<&str>) -> ClientResult<PathBuf>;
}
