//! Uniform one-minute resampling.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use radar_common::{MinutePoint, ResampledSeries, TimeSeries};

/// Resample `series` onto whole minutes `0..=horizon_minutes` after `start`.
///
/// Minute `m` is read at `pos = offset_minutes + m` minutes after the first
/// series point, so `offset_minutes` is normally the distance from
/// `series[0]` to `start`. Between control points the value is linear;
/// at or beyond the last pair it holds the last value, and before the
/// first point it holds the first.
pub fn resample(
    series: &TimeSeries,
    start: DateTime<Utc>,
    offset_minutes: f64,
    horizon_minutes: u32,
) -> ResampledSeries {
    let values = series.values();
    let bucket = series.cadence_minutes().max(1) as f64;

    let points = (0..=horizon_minutes)
        .map(|m| {
            let pos = offset_minutes + m as f64;
            MinutePoint {
                time: start + ChronoDuration::minutes(m as i64),
                value: value_at(&values, bucket, pos),
            }
        })
        .collect();

    ResampledSeries { points }
}

fn value_at(values: &[f64], bucket: f64, pos: f64) -> f64 {
    let Some(&last) = values.last() else {
        return 0.0;
    };
    // NaN holds the first value like any position before the series
    if pos.is_nan() || pos <= 0.0 {
        return values[0];
    }

    let segment = (pos / bucket).floor();
    if segment + 1.0 >= values.len() as f64 {
        return last;
    }
    let segment = segment as usize;

    let left = values[segment];
    let right = values[segment + 1];
    let frac = (pos - segment as f64 * bucket) / bucket;
    left + (right - left) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_utils::assert_series_approx_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_two_control_points() {
        let series = TimeSeries::from_values(t0(), 5, &[0.0, 10.0]).unwrap();
        let out = resample(&series, t0(), 0.0, 5);
        assert_series_approx_eq!(out.values(), [0.0, 2.0, 4.0, 6.0, 8.0, 10.0], 1e-9);
        assert_eq!(out.points[5].time, t0() + ChronoDuration::minutes(5));
    }

    #[test]
    fn test_non_finite_offset_holds_an_end() {
        let series = TimeSeries::from_values(t0(), 5, &[1.0, 10.0, 20.0]).unwrap();
        let out = resample(&series, t0(), f64::INFINITY, 2);
        assert_series_approx_eq!(out.values(), [20.0, 20.0, 20.0], 1e-9);

        let out = resample(&series, t0(), f64::NEG_INFINITY, 1);
        assert_series_approx_eq!(out.values(), [1.0, 1.0], 1e-9);

        let out = resample(&series, t0(), f64::NAN, 1);
        assert_series_approx_eq!(out.values(), [1.0, 1.0], 1e-9);
    }

    #[test]
    fn test_holds_after_last_point() {
        let series = TimeSeries::from_values(t0(), 5, &[0.0, 10.0]).unwrap();
        let out = resample(&series, t0(), 0.0, 12);
        assert_eq!(out.len(), 13);
        assert!(out.values()[5..].iter().all(|&v| v == 10.0));
    }

    #[test]
    fn test_fractional_offset_shifts_smoothly() {
        let series = TimeSeries::from_values(t0(), 5, &[0.0, 10.0, 20.0]).unwrap();
        let start = t0() + ChronoDuration::seconds(150);
        let out = resample(&series, start, 2.5, 3);
        assert_series_approx_eq!(out.values(), [5.0, 7.0, 9.0, 11.0], 1e-9);
        assert_eq!(out.points[0].time, start);
    }

    #[test]
    fn test_length_from_horizon() {
        let series = TimeSeries::from_values(t0(), 5, &[1.0; 4]).unwrap();
        assert_eq!(resample(&series, t0(), 0.0, 60).len(), 61);
        assert_eq!(resample(&series, t0(), 0.0, 0).len(), 1);
    }

    #[test]
    fn test_empty_series_yields_zeros() {
        let series = TimeSeries::default();
        let out = resample(&series, t0(), 0.0, 10);
        assert_eq!(out.len(), 11);
        assert!(out.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_negative_offset_holds_first() {
        let series = TimeSeries::from_values(t0(), 5, &[3.0, 8.0]).unwrap();
        let out = resample(&series, t0(), -2.0, 3);
        assert_series_approx_eq!(out.values(), [3.0, 3.0, 3.0, 4.0], 1e-9);
    }
}
