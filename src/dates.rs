use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::clock::Clock;
use crate::error::{Result, TaskError};

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 3600;
pub const SECONDS_PER_DAY: i64 = 86400;

/// Date only formats, tried before the date and time ones.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Every accepted format, in the order they are tried.
const DUE_DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y",
    "%d.%m.%Y %H:%M",
];

/// Parse a user supplied due date.
///
/// `today`/`now` and `tomorrow` (any case) mean the last second of that
/// day. Anything else must match one of the fixed formats in full; a date
/// only format lands at midnight. Out of range fields (month 13, day 32)
/// simply fail to match.
pub fn parse_due_date(text: &str, clock: &dyn Clock) -> Result<NaiveDateTime> {
    let trimmed = text.trim();
    let keyword = trimmed.to_lowercase();
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).expect("23:59:59 is a valid time");

    match keyword.as_str() {
        "today" | "now" => return Ok(clock.now().date().and_time(end_of_day)),
        "tomorrow" => {
            let tomorrow = clock.now().date() + Duration::days(1);
            return Ok(tomorrow.and_time(end_of_day));
        }
        _ => {}
    }

    for format in DUE_DATE_FORMATS.iter() {
        if DATE_FORMATS.contains(format) {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return Ok(midnight(date));
            }
        } else if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime);
        }
    }

    Err(TaskError::UnrecognizedDateFormat(text.to_string()))
}

/// Format a number of seconds as `1d 2h`, `3h 4m`, `5m 6s` or `7s`.
///
/// Minutes are dropped once there is a day component. Seconds only show up
/// next to a lone minutes component, or on their own when nothing else is
/// left.
pub fn format_duration(seconds: f64) -> String {
    if seconds < SECONDS_PER_MINUTE as f64 {
        return format!("{}s", seconds as i64);
    }

    let total = seconds as i64;
    let days = total / SECONDS_PER_DAY;
    let hours = (total % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = total % SECONDS_PER_MINUTE;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 && days == 0 {
        parts.push(format!("{}m", minutes));
    }

    let lone_minutes = parts.len() == 1 && minutes > 0 && days == 0 && hours == 0;
    if parts.is_empty() || (lone_minutes && secs > 0) {
        parts.push(format!("{}s", secs));
    }

    parts.join(" ")
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(0, 0, 0).expect("00:00:00 is a valid time"))
}

/// Seconds between two instants, with microsecond precision.
pub fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

/// ISO-8601 text used in stored records. Fractional seconds only appear
/// when present.
pub fn to_iso(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Read a stored ISO-8601 timestamp. Accepts a `T` or a space between date
/// and time, and a bare date (midnight).
pub fn from_iso(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    text.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(midnight)
        })
}

/// How due dates are shown to the user.
pub fn display_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M").to_string()
}
