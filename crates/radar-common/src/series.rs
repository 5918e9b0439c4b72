//! Time series, per-minute series and rain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::DEFAULT_CADENCE_MINUTES;

/// Why a step contributed a zero instead of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
    /// Every endpoint in the provider chain failed or timed out.
    SourceUnavailable,
    /// The payload arrived but could not be decoded.
    DecodeFailed,
    /// The point projects outside the tile.
    OutOfBounds,
    /// The query deadline passed before this step completed.
    Cancelled,
}

/// Provenance of one series value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepStatus {
    Observed,
    Interpolated,
    Degraded(DegradeReason),
}

impl StepStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StepStatus::Degraded(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: DateTime<Utc>,
    /// Rain rate in mm/h, never negative
    pub value: f64,
    pub status: StepStatus,
}

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("timestamp {next} precedes previous point {previous}")]
    OutOfOrder {
        previous: DateTime<Utc>,
        next: DateTime<Utc>,
    },

    #[error("cadence must be at least one minute")]
    ZeroCadence,
}

/// Ordered `(timestamp, mm/h)` sequence at a native cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    cadence_minutes: u32,
    points: Vec<SeriesPoint>,
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self {
            cadence_minutes: DEFAULT_CADENCE_MINUTES,
            points: Vec::new(),
        }
    }
}

impl TimeSeries {
    pub fn new(cadence_minutes: u32) -> Result<Self, SeriesError> {
        if cadence_minutes == 0 {
            return Err(SeriesError::ZeroCadence);
        }
        Ok(Self {
            cadence_minutes,
            points: Vec::new(),
        })
    }

    /// Build an observed series with one value per cadence step from `start`.
    pub fn from_values(
        start: DateTime<Utc>,
        cadence_minutes: u32,
        values: &[f64],
    ) -> Result<Self, SeriesError> {
        let mut series = Self::new(cadence_minutes)?;
        for (i, value) in values.iter().enumerate() {
            let time = start + chrono::Duration::minutes(i as i64 * cadence_minutes as i64);
            series.push(time, *value, StepStatus::Observed)?;
        }
        Ok(series)
    }

    /// Append a point. Timestamps must not decrease; negative or
    /// non-finite values are stored as zero.
    pub fn push(
        &mut self,
        time: DateTime<Utc>,
        value: f64,
        status: StepStatus,
    ) -> Result<(), SeriesError> {
        if let Some(last) = self.points.last() {
            if time < last.time {
                return Err(SeriesError::OutOfOrder {
                    previous: last.time,
                    next: time,
                });
            }
        }

        let value = if value.is_finite() && value > 0.0 {
            value
        } else {
            0.0
        };

        self.points.push(SeriesPoint {
            time,
            value,
            status,
        });
        Ok(())
    }

    pub fn cadence_minutes(&self) -> u32 {
        self.cadence_minutes
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first_time(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.time)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points whose value is a zero substituted for a failure.
    pub fn degraded_count(&self) -> usize {
        self.points.iter().filter(|p| p.status.is_degraded()).count()
    }
}

/// One value of the per-minute series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinutePoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Uniform one-minute series covering a fixed horizon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResampledSeries {
    pub points: Vec<MinutePoint>,
}

impl ResampledSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.time).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// First contiguous above-threshold run in a per-minute series.
///
/// `start == None` means no rain was detected within the horizon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RainEvent {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
}

impl RainEvent {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_rain(&self) -> bool {
        self.start.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_push_rejects_decreasing_time() {
        let mut series = TimeSeries::default();
        series.push(t0(), 1.0, StepStatus::Observed).unwrap();
        let err = series
            .push(t0() - chrono::Duration::minutes(5), 1.0, StepStatus::Observed)
            .unwrap_err();
        assert!(matches!(err, SeriesError::OutOfOrder { .. }));
        // Equal timestamps are allowed
        assert!(series.push(t0(), 2.0, StepStatus::Observed).is_ok());
    }

    #[test]
    fn test_push_clamps_invalid_values() {
        let mut series = TimeSeries::default();
        series.push(t0(), -3.0, StepStatus::Observed).unwrap();
        series.push(t0(), f64::NAN, StepStatus::Observed).unwrap();
        series.push(t0(), f64::INFINITY, StepStatus::Observed).unwrap();
        assert_eq!(series.values(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_from_values_spacing() {
        let series = TimeSeries::from_values(t0(), 5, &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(
            series.points()[2].time,
            t0() + chrono::Duration::minutes(10)
        );
        assert!(TimeSeries::from_values(t0(), 0, &[1.0]).is_err());
    }

    #[test]
    fn test_rain_event_serializes_camel_case() {
        let json = serde_json::to_value(RainEvent::none()).unwrap();
        assert_eq!(json["durationMinutes"], 0);
        assert!(json["start"].is_null());
    }
}
