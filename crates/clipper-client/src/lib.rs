//! Clip job client.
//!
//! Submits clip requests to the clip service, follows the job's progress
//! stream (Server-Sent Events) and reports every change through a
//! [`ProgressView`]. The HTTP side sits behind [`JobApi`] so the job state
//! machine can run against any transport.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod job_client;
pub mod sse;
pub mod view;

pub use api::JobApi;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpJobApi;
pub use job_client::{ClipJobClient, Dispatch, JobOutcome};
pub use sse::{event_stream, EventStream, SseDecoder, SseEvent};
pub use view::{MemoryView, ProgressView, UiState};
