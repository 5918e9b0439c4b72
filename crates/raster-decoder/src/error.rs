//! Decoder error types.

use thiserror::Error;

/// Raster payload could not be turned into a tile.
///
/// Callers assembling a series treat any of these as "no data for this step".
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("invalid base64 payload: {0}")]
    Base64(String),

    #[error("payload truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unsupported product: {0}")]
    UnsupportedProduct(String),

    #[error(transparent)]
    Shape(#[from] radar_common::TileShapeError),
}

/// Result type for decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
