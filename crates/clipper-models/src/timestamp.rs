//! Clip time-string handling.
//!
//! Clip boundaries are typed by users as `HH:MM:SS` or `MM:SS`. This module
//! validates those strings, converts them to seconds, reflows raw digits into
//! `HH:MM:SS` while typing and normalizes a field once editing is finished.

use std::sync::OnceLock;

use regex::Regex;

/// Longest clip the service accepts (10 minutes).
pub const MAX_CLIP_DURATION_SECS: u32 = 600;

/// Value shown in an empty or reset time field.
pub const ZERO_TIME: &str = "00:00:00";

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2}:)?\d{1,2}:\d{1,2}$").expect("valid time pattern"))
}

fn blur_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{0,2}):?(\d{0,2}):?(\d{0,2})").expect("valid blur pattern"))
}

/// Check that a string is `HH:MM:SS` or `MM:SS` (one or two digits per part).
///
/// # Examples
/// ```
/// use clipper_models::timestamp::is_valid_time;
/// assert!(is_valid_time("00:01:00"));
/// assert!(is_valid_time("5:30"));
/// assert!(!is_valid_time("90"));
/// ```
pub fn is_valid_time(value: &str) -> bool {
    time_pattern().is_match(value)
}

/// Convert a time string to seconds.
///
/// Three parts are read as `H*3600 + M*60 + S`, two parts as `M*60 + S`.
/// Anything else, including non-numeric parts, counts as zero.
///
/// # Examples
/// ```
/// use clipper_models::timestamp::to_seconds;
/// assert_eq!(to_seconds("00:03:30"), 210);
/// assert_eq!(to_seconds("05:30"), 330);
/// ```
pub fn to_seconds(value: &str) -> u32 {
    let parts: Vec<u32> = value
        .split(':')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect();

    match parts.as_slice() {
        [hours, minutes, seconds] => hours
            .saturating_mul(3600)
            .saturating_add(minutes.saturating_mul(60))
            .saturating_add(*seconds),
        [minutes, seconds] => minutes.saturating_mul(60).saturating_add(*seconds),
        _ => 0,
    }
}

/// Human-readable clip length: `0 sec`, `45 sec`, `2 min`, `2 min 30 sec`.
pub fn duration_label(seconds: u32) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;

    match (mins, secs) {
        (0, s) => format!("{} sec", s),
        (m, 0) => format!("{} min", m),
        (m, s) => format!("{} min {} sec", m, s),
    }
}

/// Reflow a time field while the user is typing.
///
/// Deletions pass through untouched so the value can be edited. Input that
/// already has colons keeps its structure with each part zero-padded; raw
/// digits are left-padded to six and split into `HH:MM:SS`.
pub fn format_time_input(value: &str, deleting: bool) -> String {
    if value.is_empty() {
        return ZERO_TIME.to_string();
    }

    if deleting {
        return value.to_string();
    }

    if value.contains(':') {
        let mut parts: Vec<String> = value.split(':').map(str::to_string).collect();
        while parts.len() < 3 {
            parts.push("00".to_string());
        }
        let joined = parts
            .iter()
            .map(|part| format!("{:0>2}", part))
            .collect::<Vec<_>>()
            .join(":");
        return joined.chars().take(8).collect();
    }

    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return ZERO_TIME.to_string();
    }

    let padded = format!("{:0>6}", digits);
    let last_six = &padded[padded.len() - 6..];
    format!("{}:{}:{}", &last_six[0..2], &last_six[2..4], &last_six[4..6])
}

/// Normalize a time field when editing ends.
///
/// Always yields strict `HH:MM:SS`; hours cap at 99, minutes and seconds
/// at 59, and an empty field becomes `00:00:00`.
pub fn normalize_time_field(value: &str) -> String {
    if value.trim().is_empty() {
        return ZERO_TIME.to_string();
    }

    let Some(caps) = blur_pattern().captures(value) else {
        return value.to_string();
    };

    let part = |index: usize, max: u32| -> u32 {
        caps.get(index)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
            .min(max)
    };

    format!("{:02}:{:02}:{:02}", part(1, 99), part(2, 59), part(3, 59))
}
