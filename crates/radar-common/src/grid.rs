//! Raster grid descriptions and decoded radar tiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::BoundingBox;

/// Direction in which increasing row index moves on the ground.
///
/// Always declared by the product definition; never inferred from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrientation {
    /// Row 0 is the northern edge; rows advance southwards.
    NorthUp,
    /// Row 0 is the southern edge; rows advance northwards.
    SouthUp,
}

/// Spherical polar-stereographic projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StereographicParams {
    /// Latitude of true scale (degrees)
    pub true_scale_lat: f64,
    /// Central meridian (degrees east)
    pub central_meridian: f64,
    /// Sphere radius (meters)
    pub earth_radius: f64,
}

impl StereographicParams {
    /// RADOLAN products: 60°N true scale, 10°E, R = 6 370 040 m.
    pub fn radolan() -> Self {
        Self {
            true_scale_lat: 60.0,
            central_meridian: 10.0,
            earth_radius: 6_370_040.0,
        }
    }

    /// HDF5 composite products published on a 6 370 000 m sphere.
    pub fn composite() -> Self {
        Self {
            earth_radius: 6_370_000.0,
            ..Self::radolan()
        }
    }
}

/// Planar grid placement under an analytic projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarGrid {
    pub projection: StereographicParams,
    /// Projected x of the grid's left edge (meters)
    pub origin_x: f64,
    /// Projected y of the row-0 edge (meters)
    pub origin_y: f64,
    /// Cell size along x (meters, positive)
    pub res_x: f64,
    /// Cell size along y (meters, positive)
    pub res_y: f64,
    pub axis_orientation: AxisOrientation,
}

/// How a tile's cells are tied to the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Georeference {
    /// Analytic polar-stereographic placement.
    Planar(PlanarGrid),
    /// Explicit `[min_lon, min_lat, max_lon, max_lat]` extent, north at row 0.
    LinearBounds(BoundingBox),
}

/// Dimensions plus georeference of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMetadata {
    pub width: usize,
    pub height: usize,
    pub georeference: Georeference,
}

impl GridMetadata {
    pub fn new(width: usize, height: usize, georeference: Georeference) -> Self {
        Self {
            width,
            height,
            georeference,
        }
    }

    /// Total number of cells, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Total number of cells, `None` if it does not fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Same georeference with different dimensions (e.g. taken from a file header).
    pub fn with_dimensions(self, width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }
}

/// Common grid definitions for radar products.
pub mod grids {
    use super::*;

    /// RADOLAN national composite, 900 columns x 900 rows at 1 km, stored south to north.
    ///
    /// The origin is the south-west corner (46.9526°N, 3.5889°E).
    pub fn radolan_national() -> GridMetadata {
        GridMetadata::new(
            900,
            900,
            Georeference::Planar(PlanarGrid {
                projection: StereographicParams::radolan(),
                origin_x: -523_462.2,
                origin_y: -4_658_645.0,
                res_x: 1000.0,
                res_y: 1000.0,
                axis_orientation: AxisOrientation::SouthUp,
            }),
        )
    }

    /// RADVOR extended grid, 900 columns x 1100 rows at 1 km, stored south to north.
    pub fn radolan_extended() -> GridMetadata {
        GridMetadata::new(
            900,
            1100,
            Georeference::Planar(PlanarGrid {
                projection: StereographicParams::radolan(),
                origin_x: -443_462.2,
                origin_y: -4_758_645.0,
                res_x: 1000.0,
                res_y: 1000.0,
                axis_orientation: AxisOrientation::SouthUp,
            }),
        )
    }

    /// Single cell covering `delta` degrees around a point (WMS GetFeatureInfo style).
    pub fn point_cell(point: crate::GeoPoint, delta: f64) -> GridMetadata {
        GridMetadata::new(
            1,
            1,
            Georeference::LinearBounds(BoundingBox::around(point, delta)),
        )
    }
}

/// Which kind of product a tile carries; decides the unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductKind {
    /// Past radar analysis, values are accumulations over one cadence step (mm).
    Analysis,
    /// Forecast reflectivity in dBZ.
    ForecastReflectivity,
    /// Forecast rain rate already in mm/h.
    ForecastRate,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::ForecastReflectivity => "forecast-reflectivity",
            Self::ForecastRate => "forecast-rate",
        }
    }

    pub fn is_forecast(&self) -> bool {
        !matches!(self, Self::Analysis)
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("tile holds {actual} values but metadata declares {width}x{height}")]
pub struct TileShapeError {
    pub width: usize,
    pub height: usize,
    pub actual: usize,
}

/// A decoded physical-value grid with its spatial metadata.
#[derive(Debug, Clone)]
pub struct RasterTile {
    /// Row-major cell values in physical units
    pub values: Vec<f32>,
    pub metadata: GridMetadata,
    pub valid_at: Option<DateTime<Utc>>,
    pub product: ProductKind,
}

impl RasterTile {
    pub fn new(
        values: Vec<f32>,
        metadata: GridMetadata,
        product: ProductKind,
    ) -> Result<Self, TileShapeError> {
        if values.len() != metadata.len() {
            return Err(TileShapeError {
                width: metadata.width,
                height: metadata.height,
                actual: values.len(),
            });
        }

        Ok(Self {
            values,
            metadata,
            valid_at: None,
            product,
        })
    }

    pub fn with_valid_at(mut self, valid_at: DateTime<Utc>) -> Self {
        self.valid_at = Some(valid_at);
        self
    }

    pub fn width(&self) -> usize {
        self.metadata.width
    }

    pub fn height(&self) -> usize {
        self.metadata.height
    }

    /// Value at (column, row); `None` outside the grid.
    pub fn get(&self, col: i64, row: i64) -> Option<f32> {
        if col < 0 || row < 0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.width() || row >= self.height() {
            return None;
        }
        self.values.get(row * self.width() + col).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_shape_checked() {
        let meta = GridMetadata::new(
            3,
            2,
            Georeference::LinearBounds(BoundingBox::new(0.0, 0.0, 3.0, 2.0)),
        );
        assert!(RasterTile::new(vec![0.0; 6], meta, ProductKind::Analysis).is_ok());
        let err = RasterTile::new(vec![0.0; 5], meta, ProductKind::Analysis).unwrap_err();
        assert_eq!(err.actual, 5);
    }

    #[test]
    fn test_len_does_not_overflow() {
        let meta = GridMetadata::new(
            usize::MAX,
            2,
            Georeference::LinearBounds(BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
        );
        assert_eq!(meta.checked_len(), None);
        assert_eq!(meta.len(), usize::MAX);
        assert!(RasterTile::new(vec![0.0; 4], meta, ProductKind::Analysis).is_err());
    }

    #[test]
    fn test_extended_preset_dimensions() {
        let grid = grids::radolan_extended();
        assert_eq!((grid.width, grid.height), (900, 1100));
    }

    #[test]
    fn test_get_row_major() {
        let meta = GridMetadata::new(
            3,
            2,
            Georeference::LinearBounds(BoundingBox::new(0.0, 0.0, 3.0, 2.0)),
        );
        let tile =
            RasterTile::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], meta, ProductKind::Analysis)
                .unwrap();
        assert_eq!(tile.get(0, 0), Some(1.0));
        assert_eq!(tile.get(2, 1), Some(6.0));
        assert_eq!(tile.get(3, 0), None);
        assert_eq!(tile.get(-1, 0), None);
    }

    #[test]
    fn test_product_kind_serde_names() {
        let json = serde_json::to_string(&ProductKind::ForecastReflectivity).unwrap();
        assert_eq!(json, "\"forecast-reflectivity\"");
        let kind: ProductKind = serde_json::from_str("\"analysis\"").unwrap();
        assert_eq!(kind, ProductKind::Analysis);
    }

    #[test]
    fn test_radolan_preset_is_south_up() {
        let grid = grids::radolan_national();
        match grid.georeference {
            Georeference::Planar(p) => {
                assert_eq!(p.axis_orientation, AxisOrientation::SouthUp);
                assert_eq!(p.projection.earth_radius, 6_370_040.0);
            }
            _ => panic!("expected planar grid"),
        }
        assert_eq!(grid.len(), 810_000);
    }
}
