//! Geographic points and bounding boxes.

use serde::{Deserialize, Serialize};

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check the point is finite and within the WGS84 latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=360.0).contains(&self.lon)
    }
}

/// A geographic or projected bounding box.
///
/// For geographic extents, x is longitude and y is latitude (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// A square box of half-size `delta` degrees centred on a point.
    pub fn around(point: GeoPoint, delta: f64) -> Self {
        Self::new(
            point.lon - delta,
            point.lat - delta,
            point.lon + delta,
            point.lat + delta,
        )
    }

    /// Parse an extent string: "minx,miny,maxx,maxy"
    pub fn from_extent_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |v: &str| {
            v.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(v.to_string()))
        };

        let bbox = Self::new(
            parse(parts[0])?,
            parse(parts[1])?,
            parse(parts[2])?,
            parse(parts[3])?,
        );

        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(BboxParseError::Degenerate(s.to_string()));
        }

        Ok(bbox)
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Check if a geographic point falls inside this extent.
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.contains_point(point.lon, point.lat)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid extent format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in extent: {0}")]
    InvalidNumber(String),

    #[error("Extent has no area: {0}")]
    Degenerate(String),
}
