//! Sample unpacking for scaled integers and half floats.
//!
//! Scaled integer formula: physical = raw * scale + offset

use serde::{Deserialize, Serialize};

use crate::half::f16_to_f32;
use crate::{DecodeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    fn read_u16(&self, pair: &[u8]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes([pair[0], pair[1]]),
            ByteOrder::Big => u16::from_be_bytes([pair[0], pair[1]]),
        }
    }
}

fn default_scale() -> f32 {
    1.0
}

/// Encoding of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SampleEncoding {
    U8 {
        #[serde(default = "default_scale")]
        scale: f32,
        #[serde(default)]
        offset: f32,
        /// Raw value that marks a missing cell (decoded as NaN)
        #[serde(default)]
        no_data: Option<u8>,
    },
    U16 {
        #[serde(default = "default_scale")]
        scale: f32,
        #[serde(default)]
        offset: f32,
        #[serde(default)]
        byte_order: ByteOrder,
        #[serde(default)]
        no_data: Option<u16>,
    },
    F16 {
        #[serde(default)]
        byte_order: ByteOrder,
    },
}

impl SampleEncoding {
    pub fn u8(scale: f32) -> Self {
        Self::U8 {
            scale,
            offset: 0.0,
            no_data: None,
        }
    }

    pub fn u16(scale: f32) -> Self {
        Self::U16 {
            scale,
            offset: 0.0,
            byte_order: ByteOrder::Little,
            no_data: None,
        }
    }

    pub fn f16() -> Self {
        Self::F16 {
            byte_order: ByteOrder::Little,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 { .. } => 1,
            Self::U16 { .. } | Self::F16 { .. } => 2,
        }
    }

    /// Unpack `count` samples from the start of `data`.
    ///
    /// Trailing bytes beyond `count` samples are ignored.
    pub fn unpack(&self, data: &[u8], count: usize) -> Result<Vec<f32>> {
        let expected = count.checked_mul(self.bytes_per_sample()).ok_or_else(|| {
            DecodeError::InvalidHeader(format!("sample count overflows: {}", count))
        })?;
        if data.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: data.len(),
            });
        }
        let data = &data[..expected];

        let values = match *self {
            Self::U8 {
                scale,
                offset,
                no_data,
            } => data
                .iter()
                .map(|&raw| {
                    if no_data == Some(raw) {
                        f32::NAN
                    } else {
                        raw as f32 * scale + offset
                    }
                })
                .collect(),
            Self::U16 {
                scale,
                offset,
                byte_order,
                no_data,
            } => data
                .chunks_exact(2)
                .map(|pair| {
                    let raw = byte_order.read_u16(pair);
                    if no_data == Some(raw) {
                        f32::NAN
                    } else {
                        raw as f32 * scale + offset
                    }
                })
                .collect(),
            Self::F16 { byte_order } => data
                .chunks_exact(2)
                .map(|pair| f16_to_f32(byte_order.read_u16(pair)))
                .collect(),
        };

        Ok(values)
    }
}
