//! Linear mapping of an explicit lon/lat extent onto a pixel grid.
//!
//! Used for tiles that are already delivered in geographic coordinates
//! (WMS GetMap/GetFeatureInfo style). North is at row 0.

use radar_common::BoundingBox;

use crate::ProjectionError;

#[derive(Debug, Clone, Copy)]
pub struct LinearExtent {
    pub bbox: BoundingBox,
    pub width: usize,
    pub height: usize,
}

impl LinearExtent {
    pub fn new(bbox: BoundingBox, width: usize, height: usize) -> Result<Self, ProjectionError> {
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(ProjectionError::InvalidGrid(format!(
                "extent has no area: {:?}",
                bbox
            )));
        }
        if width == 0 || height == 0 {
            return Err(ProjectionError::InvalidGrid(format!(
                "grid has no cells: {}x{}",
                width, height
            )));
        }

        Ok(Self {
            bbox,
            width,
            height,
        })
    }

    /// Fractional (column, row) for a point; row 0 is the northern edge.
    pub fn pixel_of(&self, lat: f64, lon: f64) -> (f64, f64) {
        let col = (lon - self.bbox.min_x) / self.bbox.width() * self.width as f64;
        let row = (self.bbox.max_y - lat) / self.bbox.height() * self.height as f64;
        (col, row)
    }

    /// Geographic centre of a cell, returned as (lat, lon).
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        let lon = self.bbox.min_x + (col as f64 + 0.5) / self.width as f64 * self.bbox.width();
        let lat = self.bbox.max_y - (row as f64 + 0.5) / self.height as f64 * self.bbox.height();
        (lat, lon)
    }
}
