// src/time.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

const ABSOLUTE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-?(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$")
            .expect("relative time pattern is valid")
    })
}

/// Parse a `-A`/`-B` argument into epoch seconds, relative to the current time.
pub fn parse_time(input: &str) -> Option<i64> {
    parse_time_at(input, Utc::now().timestamp())
}

/// Parse a time string relative to `now`.
///
/// Accepted forms:
/// * a bare epoch (`1577836800`)
/// * an absolute UTC date or date-time (`2020-01-01`, `2020-01-01 12:00:00`)
/// * a relative offset before `now`, either `-SECONDS` or `1w2d3h4m5s`
pub fn parse_time_at(input: &str, now: i64) -> Option<i64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.bytes().all(|b| b.is_ascii_digit()) {
        return input.parse().ok();
    }

    if let Some(seconds) = input.strip_prefix('-') {
        if !seconds.is_empty() && seconds.bytes().all(|b| b.is_ascii_digit()) {
            return seconds.parse::<i64>().ok().and_then(|s| now.checked_sub(s));
        }
    }

    if let Some(offset) = parse_relative(input) {
        return now.checked_sub(offset);
    }

    for format in ABSOLUTE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn parse_relative(input: &str) -> Option<i64> {
    let caps = relative_pattern().captures(input)?;
    const UNITS: [i64; 5] = [7 * 86400, 86400, 3600, 60, 1];

    let mut total: i64 = 0;
    let mut matched = false;
    for (idx, unit) in UNITS.iter().enumerate() {
        if let Some(m) = caps.get(idx + 1) {
            let count: i64 = m.as_str().parse().ok()?;
            total = total.checked_add(count.checked_mul(*unit)?)?;
            matched = true;
        }
    }
    matched.then_some(total)
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn time_str(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch.to_string())
}
