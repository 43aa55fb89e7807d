//! Interactive clip form state.
//!
//! Time fields are reflowed as the user types and normalized when editing
//! ends; the duration label follows the normalized values.

use crate::request::{Quality, RawForm};
use crate::timestamp::{
    duration_label, format_time_input, normalize_time_field, to_seconds, ZERO_TIME,
};

/// One `HH:MM:SS` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeField {
    value: String,
}

impl Default for TimeField {
    fn default() -> Self {
        Self {
            value: ZERO_TIME.to_string(),
        }
    }
}

impl TimeField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Apply a keystroke result. `deleting` is true for backspace/delete.
    pub fn on_input(&mut self, raw: &str, deleting: bool) -> &str {
        self.value = format_time_input(raw, deleting);
        &self.value
    }

    /// Editing ended.
    pub fn on_blur(&mut self) -> &str {
        self.value = normalize_time_field(&self.value);
        &self.value
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn seconds(&self) -> u32 {
        to_seconds(&self.value)
    }
}

/// The clip form: URL, clip bounds and quality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipForm {
    pub video_url: String,
    pub start: TimeField,
    pub end: TimeField,
    pub quality: Quality,
    duration: String,
}

impl Default for ClipForm {
    fn default() -> Self {
        Self {
            video_url: String::new(),
            start: TimeField::default(),
            end: TimeField::default(),
            quality: Quality::default(),
            duration: duration_label(0),
        }
    }
}

impl ClipForm {
    pub fn new(video_url: impl Into<String>, quality: Quality) -> Self {
        Self {
            video_url: video_url.into(),
            quality,
            ..Self::default()
        }
    }

    pub fn blur_start(&mut self) {
        self.start.on_blur();
        self.refresh_duration();
    }

    pub fn blur_end(&mut self) {
        self.end.on_blur();
        self.refresh_duration();
    }

    /// Label for `max(0, end - start)`.
    pub fn duration(&self) -> &str {
        &self.duration
    }

    pub fn to_raw(&self) -> RawForm {
        RawForm::new(
            self.video_url.clone(),
            self.start.value(),
            self.end.value(),
            self.quality,
        )
    }

    fn refresh_duration(&mut self) {
        let secs = self.end.seconds().saturating_sub(self.start.seconds());
        self.duration = duration_label(secs);
    }
}
