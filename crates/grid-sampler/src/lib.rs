//! Sampling of decoded radar tiles.
//!
//! Three modes share one contract: [`sample`] never fails, and a pixel
//! outside the grid yields `value = 0, in_bounds = false`.
//!
//! Missing cells (NaN) never contribute to a window; a window with no
//! finite cells reports 0.

use serde::{Deserialize, Serialize};
use tracing::debug;

use projection::{project, PixelCoord};
use radar_common::{GeoPoint, RasterTile};

/// How a value is read around the projected pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplingMode {
    /// Single cell.
    Point,
    /// Mean over the in-bounds cells of a `(2r+1)²` window.
    WindowMean { radius: u32 },
    /// Sum over the window divided by the number of strictly positive cells.
    WindowMeanPositive { radius: u32 },
}

/// Largest window radius accepted by option validation.
pub const MAX_WINDOW_RADIUS: u32 = 16;

impl SamplingMode {
    /// Window radius in cells; 0 for [`SamplingMode::Point`].
    pub fn radius(&self) -> u32 {
        match *self {
            SamplingMode::Point => 0,
            SamplingMode::WindowMean { radius } | SamplingMode::WindowMeanPositive { radius } => {
                radius
            }
        }
    }
}

impl Default for SamplingMode {
    fn default() -> Self {
        SamplingMode::WindowMean { radius: 1 }
    }
}

/// A sampled physical value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResult {
    pub value: f64,
    pub in_bounds: bool,
}

impl SampleResult {
    pub fn out_of_bounds() -> Self {
        Self {
            value: 0.0,
            in_bounds: false,
        }
    }

    fn inside(value: f64) -> Self {
        Self {
            value,
            in_bounds: true,
        }
    }
}

/// Read a value at `pixel` according to `mode`.
///
/// In-bounds status refers to the center pixel; window cells falling
/// outside the grid are simply skipped.
pub fn sample(tile: &RasterTile, pixel: PixelCoord, mode: SamplingMode) -> SampleResult {
    if !pixel.within(tile.width(), tile.height()) {
        return SampleResult::out_of_bounds();
    }

    match mode {
        SamplingMode::Point => {
            let value = tile
                .get(pixel.col, pixel.row)
                .filter(|v| v.is_finite())
                .map(|v| v as f64)
                .unwrap_or(0.0);
            SampleResult::inside(value)
        }
        SamplingMode::WindowMean { radius } => {
            let (sum, count, _) = window_stats(tile, pixel, radius);
            let value = if count > 0 { sum / count as f64 } else { 0.0 };
            SampleResult::inside(value)
        }
        SamplingMode::WindowMeanPositive { radius } => {
            let (sum, _, positive) = window_stats(tile, pixel, radius);
            let value = if positive > 0 {
                sum / positive as f64
            } else {
                0.0
            };
            SampleResult::inside(value)
        }
    }
}

/// Project a point onto the tile and sample it.
///
/// Projection failures count as out of bounds.
pub fn sample_point(tile: &RasterTile, point: GeoPoint, mode: SamplingMode) -> SampleResult {
    match project(point, &tile.metadata) {
        Ok(pixel) => sample(tile, pixel, mode),
        Err(e) => {
            debug!(lat = point.lat, lon = point.lon, error = %e, "Point could not be projected");
            SampleResult::out_of_bounds()
        }
    }
}

/// (sum, finite cells, strictly positive cells) over the window, clipped to the grid.
fn window_stats(tile: &RasterTile, center: PixelCoord, radius: u32) -> (f64, usize, usize) {
    let r = radius as i64;
    let rows = center.row.saturating_sub(r).max(0)
        ..=center.row.saturating_add(r).min(tile.height() as i64 - 1);
    let cols = center.col.saturating_sub(r).max(0)
        ..=center.col.saturating_add(r).min(tile.width() as i64 - 1);
    let mut sum = 0.0;
    let mut count = 0;
    let mut positive = 0;

    for row in rows {
        for col in cols.clone() {
            if let Some(v) = tile.get(col, row).filter(|v| v.is_finite()) {
                sum += v as f64;
                count += 1;
                if v > 0.0 {
                    positive += 1;
                }
            }
        }
    }

    (sum, count, positive)
}
