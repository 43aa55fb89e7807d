//! Credit cost calculation for clip requests.
//!
//! Clips are billed per minute of output, with a rate that depends on the
//! requested quality. The server is the authority on credits; this estimate
//! is what the user sees before submitting.
//!
//! # Example
//!
//! ```
//! use clipper_models::{clip_credit_cost, Quality};
//!
//! assert_eq!(clip_credit_cost(150, Quality::P720), 1.25);
//! ```

use crate::error::CreditError;
use crate::request::{ClipRequest, Quality};
use crate::timestamp::duration_label;

/// Credits charged per minute of clip at a given quality.
pub fn cost_per_minute(quality: Quality) -> f64 {
    match quality {
        Quality::P480 => 0.25,
        Quality::P720 => 0.5,
        Quality::P1080 => 1.0,
        Quality::P1440 => 2.0,
    }
}

/// Credits needed for a clip of `duration_secs` seconds.
pub fn clip_credit_cost(duration_secs: u32, quality: Quality) -> f64 {
    cost_per_minute(quality) * (duration_secs as f64 / 60.0)
}

/// Cost estimate shown before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditEstimate {
    pub duration_secs: u32,
    pub quality: Quality,
    pub credits: f64,
}

impl CreditEstimate {
    pub fn new(duration_secs: u32, quality: Quality) -> Self {
        Self {
            duration_secs,
            quality,
            credits: clip_credit_cost(duration_secs, quality),
        }
    }

    pub fn for_request(request: &ClipRequest) -> Self {
        Self::new(request.duration_secs(), request.quality)
    }

    /// Credits rounded to two decimals, as displayed.
    pub fn rounded(&self) -> f64 {
        (self.credits * 100.0).round() / 100.0
    }

    /// Check that `available` credits cover this estimate.
    pub fn ensure_affordable(&self, available: f64) -> Result<(), CreditError> {
        if available <= 0.0 {
            return Err(CreditError::NoneLeft);
        }

        let required = self.rounded();
        if available < required {
            return Err(CreditError::Insufficient {
                required,
                available,
            });
        }
        Ok(())
    }

    /// e.g. "2 min 30 sec at 720p: 1.25 credits"
    pub fn describe(&self) -> String {
        format!(
            "{} at {}: {:.2} credits",
            duration_label(self.duration_secs),
            self.quality,
            self.rounded()
        )
    }
}
