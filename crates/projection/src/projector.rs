//! Single entry point from a geographic point to tile pixel coordinates.

use radar_common::{AxisOrientation, GeoPoint, Georeference, GridMetadata, PlanarGrid};

use crate::{LinearExtent, PolarStereographic, ProjectionError};

/// Integer pixel location; may lie outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelCoord {
    pub col: i64,
    pub row: i64,
}

impl PixelCoord {
    pub fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }

    /// Whether the pixel lies inside `[0, width) x [0, height)`.
    pub fn within(&self, width: usize, height: usize) -> bool {
        self.col >= 0 && self.row >= 0 && (self.col as usize) < width && (self.row as usize) < height
    }
}

/// A strategy that maps geographic points to fractional pixel positions.
pub trait Projector {
    /// Fractional (column, row) of the point in this grid.
    fn to_pixel(&self, point: GeoPoint) -> Result<(f64, f64), ProjectionError>;
}

/// Analytic projection plus planar grid placement.
struct PlanarProjector<'a> {
    grid: &'a PlanarGrid,
    projection: PolarStereographic,
}

impl Projector for PlanarProjector<'_> {
    fn to_pixel(&self, point: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        if self.grid.res_x <= 0.0 || self.grid.res_y <= 0.0 {
            return Err(ProjectionError::InvalidGrid(format!(
                "resolution must be positive: {}x{}",
                self.grid.res_x, self.grid.res_y
            )));
        }

        let (x, y) = self.projection.forward(point.lat, point.lon)?;
        let col = (x - self.grid.origin_x) / self.grid.res_x;
        let row = match self.grid.axis_orientation {
            AxisOrientation::NorthUp => (self.grid.origin_y - y) / self.grid.res_y,
            AxisOrientation::SouthUp => (y - self.grid.origin_y) / self.grid.res_y,
        };
        Ok((col, row))
    }
}

impl Projector for LinearExtent {
    fn to_pixel(&self, point: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        if !point.lat.is_finite() || !point.lon.is_finite() {
            return Err(ProjectionError::NonFinite {
                lat: point.lat,
                lon: point.lon,
            });
        }
        Ok(self.pixel_of(point.lat, point.lon))
    }
}

/// Fractional pixel position of a point under the tile's declared georeference.
pub fn project_fractional(
    point: GeoPoint,
    metadata: &GridMetadata,
) -> Result<(f64, f64), ProjectionError> {
    match &metadata.georeference {
        Georeference::Planar(grid) => PlanarProjector {
            grid,
            projection: PolarStereographic::from_params(&grid.projection),
        }
        .to_pixel(point),
        Georeference::LinearBounds(bbox) => {
            LinearExtent::new(*bbox, metadata.width, metadata.height)?.to_pixel(point)
        }
    }
}

/// Pixel containing a point (floor of the fractional position).
///
/// The result is not clipped; bounds are the sampler's concern.
pub fn project(point: GeoPoint, metadata: &GridMetadata) -> Result<PixelCoord, ProjectionError> {
    let (col, row) = project_fractional(point, metadata)?;
    Ok(PixelCoord::new(col.floor() as i64, row.floor() as i64))
}
