//! Common types and utilities shared across the radar nowcast crates.

pub mod error;
pub mod geo;
pub mod grid;
pub mod series;
pub mod time;

pub use error::{NowcastError, NowcastResult};
pub use geo::{BoundingBox, GeoPoint};
pub use grid::grids;
pub use grid::{
    AxisOrientation, Georeference, GridMetadata, PlanarGrid, ProductKind, RasterTile,
    StereographicParams, TileShapeError,
};
pub use series::{
    DegradeReason, MinutePoint, RainEvent, ResampledSeries, SeriesError, SeriesPoint, StepStatus,
    TimeSeries,
};
pub use time::{floor_to_cadence, minutes_between, parse_instant, DEFAULT_CADENCE_MINUTES};
