//! Error types that cross the nowcast core boundary.
//!
//! Per-step failures (unreachable source, corrupt payload, point outside
//! the grid) are absorbed while the series is assembled. Only the variants
//! below ever reach a caller.

use thiserror::Error;

use crate::grid::ProductKind;

/// Result type alias using NowcastError.
pub type NowcastResult<T> = Result<T, NowcastError>;

/// Errors surfaced by the precipitation forecast entry point.
#[derive(Debug, Error)]
pub enum NowcastError {
    /// Every endpoint of every provider failed for every requested step.
    #[error("all sources exhausted for {product} ({attempts} fetch attempts failed)")]
    AllSourcesExhausted { product: ProductKind, attempts: usize },

    #[error("invalid forecast options: {0}")]
    InvalidOptions(String),

    #[error("invalid time series: {0}")]
    InvalidSeries(String),

    #[error("query cancelled before any step completed")]
    Cancelled,
}

impl NowcastError {
    /// Whether callers should map this error to a benign "no rain known" answer.
    pub fn is_fail_open(&self) -> bool {
        matches!(
            self,
            NowcastError::AllSourcesExhausted { .. } | NowcastError::Cancelled
        )
    }
}

impl From<crate::series::SeriesError> for NowcastError {
    fn from(err: crate::series::SeriesError) -> Self {
        NowcastError::InvalidSeries(err.to_string())
    }
}
