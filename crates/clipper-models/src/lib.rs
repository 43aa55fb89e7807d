//! Shared data models for the clip job client.
//!
//! This crate provides Serde-serializable types for:
//! - Clip requests and their local validation
//! - Job identifiers and submission responses
//! - Progress stream events
//! - Time-field formatting and duration display
//! - Credit cost estimation and rate-limit messages

pub mod credit_cost;
pub mod error;
pub mod event;
pub mod form;
pub mod job;
pub mod rate_limit;
pub mod request;
pub mod timestamp;
pub mod utils;

// Re-export common types
pub use credit_cost::{clip_credit_cost, CreditEstimate};
pub use error::{CreditError, EventParseError, ValidationError, ValidationResult};
pub use event::{display_title, CompletePayload, ProgressEvent};
pub use form::{ClipForm, TimeField};
pub use job::{ClientFingerprint, CreditsInfo, JobId, ServerErrorBody, SubmitResponse};
pub use rate_limit::rate_limit_message;
pub use request::{clip_duration, ClipRequest, Quality, RawForm};
pub use timestamp::{duration_label, MAX_CLIP_DURATION_SECS};
