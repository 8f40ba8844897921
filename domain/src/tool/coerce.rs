//! Tolerant text → value coercion for tool inputs.
//!
//! Tool inputs are plain `serde` types. Fields that need lenient parsing opt
//! in per field:
//!
//! - [`Timestamp`] (or `#[serde(with = "coerce::timestamp")]` on a
//!   `DateTime<FixedOffset>`) accepts the formats in [`TIMESTAMP_FORMATS`],
//!   first match wins.
//! - `#[serde(with = "coerce::duration")]` on a `std::time::Duration`
//!   accepts compound unit strings such as `"1h30m"` or `"500ms"`.
//! - `serde_json::Value` fields receive the intermediary value untouched.
//!
//! Nested structs, `Vec`s and `Option`s recurse through the same rules
//! because they are ordinary `serde` composition.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

/// Accepted timestamp encodings, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2026-01-20T10:30:00+05:00`
    Rfc3339,
    /// `2026-01-20T10:30:00.123456789Z`
    Rfc3339Fractional,
    /// `2026-01-20T10:30:00`, read as UTC
    LocalT,
    /// `2026-01-20 10:30:00`, read as UTC
    LocalSpace,
    /// `2026-01-20`, midnight UTC
    DateOnly,
}

pub const TIMESTAMP_FORMATS: [TimestampFormat; 5] = [
    TimestampFormat::Rfc3339,
    TimestampFormat::Rfc3339Fractional,
    TimestampFormat::LocalT,
    TimestampFormat::LocalSpace,
    TimestampFormat::DateOnly,
];

impl TimestampFormat {
    fn parse(&self, s: &str) -> Option<DateTime<FixedOffset>> {
        let utc = FixedOffset::east_opt(0)?;
        match self {
            TimestampFormat::Rfc3339 => DateTime::parse_from_rfc3339(s).ok(),
            TimestampFormat::Rfc3339Fractional => {
                DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%:z").ok()
            }
            TimestampFormat::LocalT => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().with_timezone(&utc)),
            TimestampFormat::LocalSpace => {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc().with_timezone(&utc))
            }
            TimestampFormat::DateOnly => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc().with_timezone(&utc)),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("cannot parse '{0}' as a timestamp")]
    Timestamp(String),

    #[error("cannot parse '{value}' as a duration: {reason}")]
    Duration { value: String, reason: String },
}

/// Parse a timestamp string using the first matching format.
pub fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, CoercionError> {
    let trimmed = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| format.parse(trimmed))
        .ok_or_else(|| CoercionError::Timestamp(s.to_string()))
}

/// Parse a compound-unit duration string (`"2h45m30s"`, `"500ms"`).
pub fn parse_duration(s: &str) -> Result<Duration, CoercionError> {
    humantime::parse_duration(s.trim()).map_err(|e| CoercionError::Duration {
        value: s.to_string(),
        reason: e.to_string(),
    })
}

/// A timestamp that keeps the offset it was written with.
///
/// Serializes back to RFC 3339, so a value that was already in timestamp
/// form passes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<FixedOffset>);

impl Timestamp {
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }
}

impl std::ops::Deref for Timestamp {
    type Target = DateTime<FixedOffset>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::str::FromStr for Timestamp {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_timestamp(s).map(Timestamp)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .map(Timestamp)
            .map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "coerce::timestamp")]` for `DateTime<FixedOffset>` fields.
pub mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        Timestamp(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        Timestamp::deserialize(deserializer).map(|t| t.0)
    }
}

/// `#[serde(with = "coerce::duration")]` for `std::time::Duration` fields.
///
/// Accepts a duration string, or a non-negative number of seconds.
/// Serializes as a humantime string (`"1h 30m"`).
pub mod duration {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Text(String),
        Seconds(f64),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
            RawDuration::Seconds(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|e| serde::de::Error::custom(format!("invalid duration {}: {}", secs, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_date_only_is_midnight_utc() {
        let ts = parse_timestamp("2026-01-20").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!((ts.year(), ts.month(), ts.day()), (2026, 1, 20));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (0, 0, 0));
    }

    #[test]
    fn test_offset_is_preserved_on_round_trip() {
        let ts: Timestamp = "2026-01-20T10:30:00+05:00".parse().unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 5 * 3600);
        assert_eq!(ts.to_string(), "2026-01-20T10:30:00+05:00");
    }

    #[test]
    fn test_fractional_and_naive_formats() {
        let frac = parse_timestamp("2026-01-20T10:30:00.250Z").unwrap();
        assert_eq!(frac.nanosecond(), 250_000_000);

        let naive_t = parse_timestamp("2026-01-20T10:30:00").unwrap();
        let naive_space = parse_timestamp("2026-01-20 10:30:00").unwrap();
        assert_eq!(naive_t, naive_space);
        assert_eq!(naive_t.offset().local_minus_utc(), 0);
        assert_eq!(naive_t.hour(), 10);
    }

    #[test]
    fn test_bad_timestamp() {
        assert!(matches!(
            parse_timestamp("tomorrow"),
            Err(CoercionError::Timestamp(_))
        ));
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(
            parse_duration("2h45m30s").unwrap(),
            Duration::from_secs(2 * 3600 + 45 * 60 + 30)
        );
        assert!(parse_duration("soon").is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Window {
        start: Timestamp,
        #[serde(with = "duration")]
        length: Duration,
    }

    #[derive(Debug, Deserialize)]
    struct Schedule {
        windows: Vec<Window>,
        #[serde(with = "timestamp")]
        created: DateTime<FixedOffset>,
        extra: serde_json::Value,
    }

    #[test]
    fn test_nested_structs_and_slices_recurse() {
        let schedule: Schedule = serde_json::from_value(json!({
            "windows": [
                {"start": "2026-01-20", "length": "1h30m"},
                {"start": "2026-01-21 08:00:00", "length": 0.5}
            ],
            "created": "2026-01-19T23:00:00+01:00",
            "extra": {"anything": [1, "two"]}
        }))
        .unwrap();

        assert_eq!(schedule.windows.len(), 2);
        assert_eq!(schedule.windows[0].length, Duration::from_secs(5400));
        assert_eq!(schedule.windows[1].length, Duration::from_millis(500));
        assert_eq!(schedule.windows[1].start.hour(), 8);
        assert_eq!(schedule.created.offset().local_minus_utc(), 3600);
        assert_eq!(schedule.extra, json!({"anything": [1, "two"]}));
    }

    #[test]
    fn test_bad_nested_value_reports_error() {
        let err = serde_json::from_value::<Window>(json!({"start": "nope", "length": "1h"}))
            .unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }
}
