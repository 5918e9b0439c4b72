//! Coordinate reference system transformations for radar grids.
//!
//! Implements map projections from scratch without external dependencies.
//! Every tile declares its georeference; [`project`] reads that declaration
//! and picks the matching strategy, so callers never special-case tiles.

pub mod error;
pub mod linear;
pub mod polar;
pub mod projector;

pub use error::ProjectionError;
pub use linear::LinearExtent;
pub use polar::PolarStereographic;
pub use projector::{project, project_fractional, PixelCoord, Projector};
