//! Utility functions for display formatting and path construction

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Units for [`format_size`], each 1024 times the previous one
const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Units for [`format_duration`] with the factor leading to the next unit
const DURATION_UNITS: [(&str, f64); 4] = [("s", 60.0), ("min", 60.0), ("h", 24.0), (" days", 0.0)];

/// Longest file name stem produced by [`sanitize_file_name`], in bytes
const MAX_FILE_STEM_BYTES: usize = 200;

/// Characters that cannot appear in a path component on common filesystems
const RESERVED_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Format a byte count with binary magnitude steps
///
/// The value is divided by 1024 one unit at a time until it drops below 1024 or
/// the largest unit (GB) is reached.
///
/// ```
/// use channel_dl::utils::format_size;
///
/// assert_eq!(format_size(500.0), "500.00 B");
/// assert_eq!(format_size(2048.0), "2.00 KB");
/// assert_eq!(format_size(1536.0 * 1024.0), "1.50 MB");
/// ```
pub fn format_size(bytes: f64) -> String {
    let mut value = bytes;
    let mut unit = 0;
    while unit < SIZE_UNITS.len() - 1 && value >= 1024.0 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, SIZE_UNITS[unit])
}

/// Format a number of seconds as s/min/h/days, without decimals
///
/// ```
/// use channel_dl::utils::format_duration;
///
/// assert_eq!(format_duration(45.0), "45s");
/// assert_eq!(format_duration(125.0), "2min");
/// assert_eq!(format_duration(7300.0), "2h");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let mut value = seconds;
    let mut unit = 0;
    while unit < DURATION_UNITS.len() - 1 && value >= DURATION_UNITS[unit].1 {
        value /= DURATION_UNITS[unit].1;
        unit += 1;
    }
    format!("{:.0}{}", value, DURATION_UNITS[unit].0)
}

/// Make a title safe to use as a single path component
///
/// Path separators, reserved characters and control characters become `_`,
/// surrounding whitespace and dots are trimmed and the result is capped at 200
/// bytes. When nothing usable is left, `fallback` (typically the video id) is used.
pub fn sanitize_file_name(name: &str, fallback: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim().trim_matches('.').trim();
    let mut end = trimmed.len().min(MAX_FILE_STEM_BYTES);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    let stem = trimmed[..end].trim_end();

    if stem.is_empty() {
        fallback.to_string()
    } else {
        stem.to_string()
    }
}

fn iso8601_duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(
            r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
        )
        .expect("ISO-8601 duration pattern is valid")
    })
}

/// Parse an ISO-8601 duration such as `PT1H2M3S` or `P1DT2H`
///
/// Returns `None` for anything that is not a duration, including the bare `P` and `PT`.
pub fn parse_iso8601_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value == "P" || value.ends_with('T') {
        return None;
    }
    let caps = iso8601_duration_regex().captures(value)?;

    let whole = |idx: usize| -> u64 {
        caps.get(idx)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    let seconds = caps
        .get(5)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);

    let total = whole(1) * 7 * 86_400 + whole(2) * 86_400 + whole(3) * 3_600 + whole(4) * 60;
    Some(Duration::from_secs(total) + Duration::from_secs_f64(seconds))
}
