//! Wire timestamps: local time, no offset, `YYYY-MM-DDTHH:MM:SS.ffffff`.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fractional-second precision of generated timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPrecision {
    /// Six fractional digits. This is what the backend expects.
    #[default]
    Micros,
    /// Three fractional digits.
    Millis,
}

impl TimestampPrecision {
    fn pattern(self) -> &'static str {
        match self {
            TimestampPrecision::Micros => "%Y-%m-%dT%H:%M:%S%.6f",
            TimestampPrecision::Millis => "%Y-%m-%dT%H:%M:%S%.3f",
        }
    }
}

/// Current local time in the default (microsecond) wire format.
pub fn current_timestamp() -> String {
    current_timestamp_with(TimestampPrecision::Micros)
}

pub fn current_timestamp_with(precision: TimestampPrecision) -> String {
    let ts = format_timestamp(&Local::now(), precision);
    debug!(timestamp = %ts, "generated timestamp");
    ts
}

/// Formats `dt` in its own zone, dropping the offset.
///
/// Whitespace in the output is replaced by `'0'` so a padded field can
/// never reach the backend.
pub fn format_timestamp<Tz>(dt: &DateTime<Tz>, precision: TimestampPrecision) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    dt.format(precision.pattern())
        .to_string()
        .chars()
        .map(|c| if c.is_whitespace() { '0' } else { c })
        .collect()
}

/// Checks that `s` has the exact shape produced by [`format_timestamp`].
pub fn is_wire_timestamp(s: &str, precision: TimestampPrecision) -> bool {
    let digits = match precision {
        TimestampPrecision::Micros => 6,
        TimestampPrecision::Millis => 3,
    };
    let Some((head, frac)) = s.split_once('.') else {
        return false;
    };
    frac.len() == digits
        && frac.bytes().all(|b| b.is_ascii_digit())
        && chrono::NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").is_ok()
        && head.len() == 19
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn fixed() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2016, 3, 7)
            .and_then(|d| d.and_hms_micro_opt(9, 4, 5, 42))
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_micro_format_is_zero_padded() {
        let s = format_timestamp(&fixed(), TimestampPrecision::Micros);
        assert_eq!(s, "2016-03-07T09:04:05.000042");
    }

    #[test]
    fn test_milli_format_truncates() {
        let s = format_timestamp(&fixed(), TimestampPrecision::Millis);
        assert_eq!(s, "2016-03-07T09:04:05.000");
    }

    #[test]
    fn test_current_timestamp_shape() {
        let s = current_timestamp();
        assert!(is_wire_timestamp(&s, TimestampPrecision::Micros), "bad timestamp {s}");
        assert!(!s.contains(' '));
        assert!(!s.contains('+') && !s.ends_with('Z'));
    }

    #[test]
    fn test_wire_timestamp_rejects_malformed() {
        assert!(!is_wire_timestamp("2016-03-07 09:04:05.000042", TimestampPrecision::Micros));
        assert!(!is_wire_timestamp("2016-03-07T09:04:05", TimestampPrecision::Micros));
        assert!(!is_wire_timestamp("2016-03-07T09:04:05.123", TimestampPrecision::Micros));
        assert!(is_wire_timestamp("2016-03-07T09:04:05.123", TimestampPrecision::Millis));
    }
}
