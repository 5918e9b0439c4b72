//! Projection error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("coordinate is not finite: lat={lat}, lon={lon}")]
    NonFinite { lat: f64, lon: f64 },

    #[error("latitude {0} is the projection's singular pole")]
    SingularPoint(f64),

    #[error("invalid grid definition: {0}")]
    InvalidGrid(String),
}
