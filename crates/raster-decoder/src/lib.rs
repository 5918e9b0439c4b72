//! Radar raster payload decoding.
//!
//! Turns a raw byte payload into a physical-unit [`RasterTile`]:
//!
//! ```text
//! payload ──► transport (binary | base64 text)
//!         ──► compression (none | gzip | deflate | zlib | auto)
//!         ──► format (raw samples + declared grid | RADOLAN frame)
//!         ──► RasterTile { values, metadata, valid_at, product }
//! ```
//!
//! Sample encodings cover 8-bit and 16-bit scaled integers and IEEE-754
//! half-precision floats.

pub mod compression;
pub mod error;
pub mod half;
pub mod radolan;
pub mod samples;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use radar_common::{GridMetadata, ProductKind, RasterTile};

pub use compression::{decompress, Compression, Transport};
pub use error::{DecodeError, Result};
pub use half::f16_to_f32;
pub use radolan::{RadolanFrame, RadolanHeader};
pub use samples::{ByteOrder, SampleEncoding};

/// Layout of the decompressed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RasterFormat {
    /// Headerless samples; geometry comes from the product definition.
    Raw {
        sample: SampleEncoding,
        grid: GridMetadata,
    },
    /// RADOLAN binary frame: ASCII header, ETX, packed samples.
    ///
    /// Dimensions are taken from the header; `grid` supplies the georeference.
    Radolan { grid: GridMetadata },
}

/// Everything needed to turn a payload into a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterEncoding {
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub compression: Compression,
    pub format: RasterFormat,
}

impl RasterEncoding {
    pub fn raw(sample: SampleEncoding, grid: GridMetadata) -> Self {
        Self {
            transport: Transport::Binary,
            compression: Compression::None,
            format: RasterFormat::Raw { sample, grid },
        }
    }

    pub fn radolan(grid: GridMetadata) -> Self {
        Self {
            transport: Transport::Binary,
            compression: Compression::Auto,
            format: RasterFormat::Radolan { grid },
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }
}

/// Decode a payload into a tile of physical values.
pub fn decode(payload: &[u8], encoding: &RasterEncoding, product: ProductKind) -> Result<RasterTile> {
    let unpacked: Bytes = compression::unwrap_payload(payload, encoding.transport, encoding.compression)?;

    debug!(
        payload_bytes = payload.len(),
        unpacked_bytes = unpacked.len(),
        compression = %encoding.compression,
        "Unpacked raster payload"
    );

    match &encoding.format {
        RasterFormat::Raw { sample, grid } => {
            let count = match grid.checked_len() {
                Some(count) if count > 0 => count,
                _ => {
                    return Err(DecodeError::InvalidHeader(format!(
                        "declared grid has no usable cell count: {}x{}",
                        grid.width, grid.height
                    )))
                }
            };
            let values = sample.unpack(&unpacked, count)?;
            Ok(RasterTile::new(values, *grid, product)?)
        }
        RasterFormat::Radolan { grid } => {
            let frame = RadolanFrame::parse(&unpacked)?;
            let metadata = grid.with_dimensions(frame.header.cols, frame.header.rows);
            let mut tile = RasterTile::new(frame.values, metadata, product)?;
            tile.valid_at = frame.header.valid_at();
            Ok(tile)
        }
    }
}
