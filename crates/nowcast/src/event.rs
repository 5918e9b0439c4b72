//! Rain event detection.
//!
//! Only the first contiguous run above the threshold is reported; a
//! second, separate period later in the horizon is ignored.

use radar_common::{RainEvent, ResampledSeries};

/// Default threshold in mm/h.
pub const DEFAULT_THRESHOLD_MM_PER_HOUR: f64 = 0.1;

/// Index range `(first, last)` of the first run of values strictly above
/// `threshold`.
pub fn detect_run(values: &[f64], threshold: f64) -> Option<(usize, usize)> {
    let first = values.iter().position(|&v| v > threshold)?;
    let len = values[first..]
        .iter()
        .take_while(|&&v| v > threshold)
        .count();
    Some((first, first + len - 1))
}

/// First rain event in a per-minute series.
pub fn detect(series: &ResampledSeries, threshold: f64) -> RainEvent {
    match detect_run(&series.values(), threshold) {
        Some((first, last)) => RainEvent {
            start: Some(series.points[first].time),
            end: Some(series.points[last].time),
            duration_minutes: (last - first + 1) as u32,
        },
        None => RainEvent::default(),
    }
}
