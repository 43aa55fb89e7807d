//! Rate-limit message formatting.
//!
//! A 429 response may carry `X-RateLimit-Reset` (unix seconds). The user is
//! told how long to wait, coarsened to the two most significant units.

use chrono::{DateTime, Utc};

const FALLBACK: &str = "You've made too many requests. Please try again later.";

/// Time left until a rate-limit window resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTime {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_seconds: i64,
}

impl RetryTime {
    pub fn until(reset_timestamp: i64, now: DateTime<Utc>) -> Self {
        let total_seconds = (reset_timestamp - now.timestamp()).max(0);
        Self {
            hours: total_seconds / 3600,
            minutes: (total_seconds % 3600) / 60,
            seconds: total_seconds % 60,
            total_seconds,
        }
    }

    /// `2h 30m`, `2h`, `45m 30s`, `45m`, `30s`, or `shortly`.
    pub fn describe(&self) -> String {
        if self.total_seconds <= 0 {
            return "shortly".to_string();
        }

        if self.hours > 0 {
            if self.minutes > 0 {
                format!("{}h {}m", self.hours, self.minutes)
            } else {
                format!("{}h", self.hours)
            }
        } else if self.minutes > 0 {
            if self.seconds > 0 {
                format!("{}m {}s", self.minutes, self.seconds)
            } else {
                format!("{}m", self.minutes)
            }
        } else {
            format!("{}s", self.seconds)
        }
    }
}

/// User-facing text for a 429 response.
pub fn rate_limit_message(reset_header: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(reset) = reset_header.and_then(|value| value.trim().parse::<i64>().ok()) else {
        return FALLBACK.to_string();
    };

    let retry = RetryTime::until(reset, now);
    format!(
        "You've made too many requests. Please try again in {}.",
        retry.describe()
    )
}
