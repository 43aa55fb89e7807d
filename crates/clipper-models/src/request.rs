//! Clip request definitions and local validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::timestamp::{is_valid_time, to_seconds, MAX_CLIP_DURATION_SECS};
use crate::utils::check_video_link;

/// Output quality (vertical resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Quality {
    #[serde(rename = "480")]
    P480,
    #[default]
    #[serde(rename = "720")]
    P720,
    #[serde(rename = "1080")]
    P1080,
    #[serde(rename = "1440")]
    P1440,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::P480, Quality::P720, Quality::P1080, Quality::P1440];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::P480 => "480",
            Quality::P720 => "720",
            Quality::P1080 => "1080",
            Quality::P1440 => "1440",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ValidationError;

    /// Accepts `720` as well as `720p`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix(['p', 'P']).unwrap_or(trimmed);
        Quality::ALL
            .into_iter()
            .find(|q| q.as_str() == digits)
            .ok_or_else(|| ValidationError::InvalidQuality(s.to_string()))
    }
}

/// Form values exactly as the user entered them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawForm {
    pub video_url: String,
    pub clip_start: String,
    pub clip_end: String,
    pub quality: Quality,
}

impl RawForm {
    pub fn new(
        video_url: impl Into<String>,
        clip_start: impl Into<String>,
        clip_end: impl Into<String>,
        quality: Quality,
    ) -> Self {
        Self {
            video_url: video_url.into(),
            clip_start: clip_start.into(),
            clip_end: clip_end.into(),
            quality,
        }
    }
}

/// Body of the job submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRequest {
    /// Video page URL (trimmed)
    pub video_url: String,
    /// Clip start (`HH:MM:SS` or `MM:SS`)
    pub clip_start: String,
    /// Clip end (`HH:MM:SS` or `MM:SS`)
    pub clip_end: String,
    /// Requested output quality
    pub quality: Quality,
}

impl ClipRequest {
    /// Validate raw form values and build a request.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// 1. URL present (then known-bad link shapes)
    /// 2. both times present
    /// 3. both times well-formed
    /// 4. end after start
    /// 5. duration within [`MAX_CLIP_DURATION_SECS`]
    pub fn from_form(form: &RawForm) -> ValidationResult<Self> {
        let video_url = form.video_url.trim();
        if video_url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        check_video_link(video_url)?;

        clip_duration(&form.clip_start, &form.clip_end)?;

        Ok(Self {
            video_url: video_url.to_string(),
            clip_start: form.clip_start.clone(),
            clip_end: form.clip_end.clone(),
            quality: form.quality,
        })
    }

    /// Clip length in seconds.
    pub fn duration_secs(&self) -> u32 {
        to_seconds(&self.clip_end).saturating_sub(to_seconds(&self.clip_start))
    }
}

/// Validate a clip window and return its length in seconds.
pub fn clip_duration(start: &str, end: &str) -> ValidationResult<u32> {
    if start.is_empty() || end.is_empty() {
        return Err(ValidationError::MissingTimes);
    }

    if !is_valid_time(start) || !is_valid_time(end) {
        return Err(ValidationError::InvalidTimeFormat);
    }

    let start_secs = to_seconds(start);
    let end_secs = to_seconds(end);
    if end_secs <= start_secs {
        return Err(ValidationError::EndNotAfterStart);
    }

    let duration_secs = end_secs - start_secs;
    if duration_secs > MAX_CLIP_DURATION_SECS {
        return Err(ValidationError::DurationTooLong { duration_secs });
    }

    Ok(duration_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(url: &str, start: &str, end: &str) -> RawForm {
        RawForm::new(url, start, end, Quality::P720)
    }

    #[test]
    fn test_valid_request() {
        let request = ClipRequest::from_form(&form("  https://x/y ", "00:01:00", "00:03:30")).unwrap();
        assert_eq!(request.video_url, "https://x/y");
        assert_eq!(request.duration_secs(), 150);
    }

    #[test]
    fn test_request_serialization() {
        let request = ClipRequest::from_form(&form("https://x/y", "00:01:00", "00:03:30")).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "videoUrl": "https://x/y",
                "clipStart": "00:01:00",
                "clipEnd": "00:03:30",
                "quality": "720"
            })
        );
    }

    #[test]
    fn test_validation_order() {
        // Empty URL wins over every other problem.
        assert_eq!(
            ClipRequest::from_form(&form("   ", "", "bad")),
            Err(ValidationError::EmptyUrl)
        );
        assert_eq!(
            ClipRequest::from_form(&form("https://x/y", "", "00:01:00")),
            Err(ValidationError::MissingTimes)
        );
        assert_eq!(
            ClipRequest::from_form(&form("https://x/y", "1:00:00:00", "00:01:00")),
            Err(ValidationError::InvalidTimeFormat)
        );
        assert_eq!(
            ClipRequest::from_form(&form("https://x/y", "00:05:00", "00:04:00")),
            Err(ValidationError::EndNotAfterStart)
        );
        assert_eq!(
            ClipRequest::from_form(&form("https://x/y", "00:00:00", "00:10:01")),
            Err(ValidationError::DurationTooLong { duration_secs: 601 })
        );
    }

    #[test]
    fn test_end_not_after_start_for_all_orderings() {
        let times = ["00:00", "00:30", "01:00", "00:10:00", "1:00:00", "59:59"];
        for a in times {
            for b in times {
                if to_seconds(b) <= to_seconds(a) {
                    assert_eq!(
                        ClipRequest::from_form(&form("https://x/y", a, b)),
                        Err(ValidationError::EndNotAfterStart),
                        "start={} end={}",
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn test_duration_limit_boundary() {
        assert!(ClipRequest::from_form(&form("https://x/y", "00:00:00", "00:10:00")).is_ok());
        assert!(ClipRequest::from_form(&form("https://x/y", "01:00:00", "01:10:00")).is_ok());
        assert!(matches!(
            ClipRequest::from_form(&form("https://x/y", "00:00:00", "01:00:00")),
            Err(ValidationError::DurationTooLong { .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::EndNotAfterStart.to_string(),
            "End time must be after start time"
        );
        assert_eq!(
            ValidationError::DurationTooLong { duration_secs: 700 }.to_string(),
            "Clip duration cannot exceed 10 minutes"
        );
    }

    #[test]
    fn test_playlist_rejected() {
        assert_eq!(
            ClipRequest::from_form(&form("https://youtube.com/watch?v=a&list=b", "00:00", "00:10")),
            Err(ValidationError::PlaylistLink)
        );
    }

    #[test]
    fn test_clip_duration() {
        assert_eq!(clip_duration("05:30", "00:08:00"), Ok(150));
        assert_eq!(clip_duration("", "00:01:00"), Err(ValidationError::MissingTimes));
    }

    #[test]
    fn test_quality_parsing() {
        assert_eq!("1080".parse::<Quality>().unwrap(), Quality::P1080);
        assert_eq!("480p".parse::<Quality>().unwrap(), Quality::P480);
        assert!("360".parse::<Quality>().is_err());
        assert_eq!(Quality::default(), Quality::P720);
        assert_eq!(Quality::P1440.to_string(), "1440p");
    }
}
