//! Progress stream events.
//!
//! The progress endpoint pushes named Server-Sent Events, each carrying a
//! JSON payload. This module turns an `(event name, data)` pair into a typed
//! [`ProgressEvent`].

use serde::{Deserialize, Serialize};

use crate::error::EventParseError;

/// Titles longer than this are cut and suffixed with an ellipsis.
pub const MAX_TITLE_CHARS: usize = 50;

/// Fallback text for a server error event without a usable message.
pub const GENERIC_PROCESSING_ERROR: &str = "An error occurred during processing";

/// Event pushed by the progress endpoint for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Connection established
    Open,
    /// Video title resolved
    Title(String),
    /// Raw progress value, not yet clamped
    Progress(i64),
    /// Clip is ready
    Complete(CompletePayload),
    /// Server reported a failure for this job
    ServerError(String),
    /// Transport failed; carries no payload
    StreamError,
}

impl ProgressEvent {
    /// Decode a named stream event.
    ///
    /// Returns `Ok(None)` for events that carry nothing actionable (unknown
    /// names, empty server error frames, `message` frames without an
    /// `error` field).
    pub fn parse(event: &str, data: &str) -> Result<Option<Self>, EventParseError> {
        let malformed = |source: serde_json::Error| EventParseError {
            event: event.to_string(),
            source,
        };

        match event {
            "title" => {
                let payload: TitlePayload = serde_json::from_str(data).map_err(malformed)?;
                Ok(Some(ProgressEvent::Title(payload.title)))
            }
            "progress" => {
                let payload: ProgressPayload = serde_json::from_str(data).map_err(malformed)?;
                let value = payload.progress.value().ok_or_else(|| {
                    malformed(<serde_json::Error as serde::de::Error>::custom("progress is not a number"))
                })?;
                Ok(Some(ProgressEvent::Progress(value)))
            }
            "complete" => {
                let payload: CompletePayload = serde_json::from_str(data).map_err(malformed)?;
                Ok(Some(ProgressEvent::Complete(payload)))
            }
            "error" => {
                if data.trim().is_empty() {
                    return Ok(None);
                }
                // An unreadable error frame is still an error.
                match serde_json::from_str::<ErrorPayload>(data) {
                    Ok(payload) => Ok(payload.message.map(ProgressEvent::ServerError)),
                    Err(_) => Ok(Some(ProgressEvent::ServerError(
                        GENERIC_PROCESSING_ERROR.to_string(),
                    ))),
                }
            }
            "message" => {
                if data.trim().is_empty() {
                    return Ok(None);
                }
                let payload: MessagePayload = serde_json::from_str(data).map_err(malformed)?;
                Ok(payload.error.map(ProgressEvent::ServerError))
            }
            _ => Ok(None),
        }
    }
}

/// Title as shown in the status line.
///
/// # Examples
/// ```
/// use clipper_models::display_title;
/// assert_eq!(display_title("Short"), "Short");
/// assert_eq!(display_title(&"a".repeat(60)), format!("{}...", "a".repeat(50)));
/// ```
pub fn display_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let cut: String = title.chars().take(MAX_TITLE_CHARS).collect();
        format!("{}...", cut)
    } else {
        title.to_string()
    }
}

/// Payload of the `complete` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePayload {
    /// Where to fetch the finished clip (older servers send `url`)
    #[serde(rename = "downloadUrl", alias = "url", default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Suggested file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TitlePayload {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ProgressPayload {
    #[serde(default)]
    progress: ProgressValue,
}

/// Progress arrives as a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProgressValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Default for ProgressValue {
    fn default() -> Self {
        ProgressValue::Int(0)
    }
}

impl ProgressValue {
    fn value(&self) -> Option<i64> {
        match self {
            ProgressValue::Int(v) => Some(*v),
            ProgressValue::Float(v) => Some(v.trunc() as i64),
            ProgressValue::Text(s) => leading_integer(s),
        }
    }
}

/// Integer prefix of a string (`"45"`, `" 45%"`, `"-5"`); `None` without digits.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|v| sign * v)
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    error: Option<String>,
}
