//! Model-level error types.

use thiserror::Error;

use crate::timestamp::MAX_CLIP_DURATION_SECS;

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Local, pre-network rejection of a clip request.
///
/// The `Display` text is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a video URL")]
    EmptyUrl,

    #[error("It looks like you used a playlist link. Please copy the video link from the Share button instead.")]
    PlaylistLink,

    #[error("It looks like you used a Google search link. Please copy the actual video URL instead.")]
    GoogleSearchLink,

    #[error("It looks like you used a Bing search link. Please copy the actual video URL instead.")]
    BingSearchLink,

    #[error("Please specify both start and end times")]
    MissingTimes,

    #[error("Please enter times in HH:MM:SS or MM:SS format")]
    InvalidTimeFormat,

    #[error("End time must be after start time")]
    EndNotAfterStart,

    #[error("Clip duration cannot exceed {} minutes", MAX_CLIP_DURATION_SECS / 60)]
    DurationTooLong { duration_secs: u32 },

    #[error("Invalid quality: {0}")]
    InvalidQuality(String),
}

/// A clip the account cannot pay for.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CreditError {
    #[error("No credits available.")]
    NoneLeft,

    #[error("Not enough credits. This clip requires {required} credits, but you only have {available}.")]
    Insufficient { required: f64, available: f64 },
}

/// A progress stream payload that could not be decoded.
#[derive(Debug, Error)]
#[error("Malformed '{event}' payload: {source}")]
pub struct EventParseError {
    pub event: String,
    #[source]
    pub source: serde_json::Error,
}
