//! Time handling utilities for radar cadences.

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, TimeZone, Utc};

/// Native spacing of radar analysis products.
pub const DEFAULT_CADENCE_MINUTES: u32 = 5;

/// Round an instant down onto the cadence grid (e.g. 12:07:31 -> 12:05:00).
pub fn floor_to_cadence(instant: DateTime<Utc>, cadence_minutes: u32) -> DateTime<Utc> {
    let step = Duration::minutes(cadence_minutes.max(1) as i64);
    instant.duration_trunc(step).unwrap_or(instant)
}

/// Signed difference `to - from` in fractional minutes.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Parse an ISO 8601 instant; a missing offset is read as UTC.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_to_cadence() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 7, 31).unwrap();
        let floored = floor_to_cadence(t, 5);
        assert_eq!(floored, Utc.with_ymd_and_hms(2024, 6, 1, 12, 5, 0).unwrap());

        let on_grid = Utc.with_ymd_and_hms(2024, 6, 1, 12, 10, 0).unwrap();
        assert_eq!(floor_to_cadence(on_grid, 5), on_grid);
    }

    #[test]
    fn test_minutes_between() {
        let a = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 6, 1, 12, 2, 30).unwrap();
        assert!((minutes_between(a, b) - 2.5).abs() < 1e-9);
        assert!((minutes_between(b, a) + 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_instant() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_instant("2024-06-01T12:00:00Z").unwrap(), expected);
        assert_eq!(parse_instant("2024-06-01T14:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_instant("2024-06-01T12:00").unwrap(), expected);
        assert!(parse_instant("yesterday").is_err());
    }
}
