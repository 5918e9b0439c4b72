//! Radar nowcast pipeline.
//!
//! For one point and instant:
//!
//! 1. [`SeriesBuilder`] fetches analysis and forecast tiles per 5-minute
//!    step through [`ProviderChain`]s, decodes, samples and converts them
//!    to mm/h.
//! 2. [`resample`] turns the series into one value per minute starting at
//!    the query instant.
//! 3. [`detect`] reports the first contiguous rain interval.
//!
//! [`get_precipitation_forecast`] runs all three.

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod provider;
pub mod resample;
pub mod trend;
pub mod zr;

pub use builder::SeriesBuilder;
pub use cache::DailyCache;
pub use config::ForecastOptions;
pub use error::{FetchError, FetchResult};
pub use event::{detect, detect_run, DEFAULT_THRESHOLD_MM_PER_HOUR};
pub use pipeline::{get_precipitation_forecast, ForecastResult};
pub use provider::{
    ChainFailure, Fetched, FileProvider, HttpProvider, ProviderChain, Providers, RasterProvider,
    StepRequest, TileSource, UrlTemplate,
};
pub use resample::resample;
pub use trend::{HttpTableLoader, RegionTrend, TableLoader, TrendEntry, TrendService, TrendTable};
pub use zr::{dbz_to_rain, rain_to_dbz};
