//! Outer payload stages applied before sample interpretation.

use std::io::Read;

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{DecodeError, Result};

/// How the payload travels: raw bytes or base64 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Binary,
    /// Standard-alphabet base64; surrounding whitespace and line breaks are ignored.
    Base64,
}

/// Compression codec wrapped around the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    /// Raw deflate stream without header.
    Deflate,
    /// Deflate with zlib header.
    Zlib,
    /// Detect gzip/zlib by magic bytes, otherwise pass through.
    Auto,
}

/// Case-insensitive; `gz` is accepted for gzip.
impl std::str::FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            "deflate" => Ok(Self::Deflate),
            "zlib" => Ok(Self::Zlib),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown compression: '{}'", other)),
        }
    }
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Zlib => "zlib",
            Self::Auto => "auto",
        }
    }

    /// Guess the codec from the leading bytes.
    pub fn detect(data: &[u8]) -> Self {
        match data {
            [0x1f, 0x8b, ..] => Self::Gzip,
            // zlib: CM=8 and the header checksum holds
            [cmf, flg, ..] if cmf & 0x0f == 8 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0 => {
                Self::Zlib
            }
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decompress `data` with the given codec.
pub fn decompress(data: &[u8], compression: Compression) -> Result<Bytes> {
    let codec = match compression {
        Compression::Auto => Compression::detect(data),
        other => other,
    };

    let mut out = Vec::new();
    let read = match codec {
        Compression::None | Compression::Auto => return Ok(Bytes::copy_from_slice(data)),
        Compression::Gzip => flate2::read::GzDecoder::new(data).read_to_end(&mut out),
        Compression::Deflate => flate2::read::DeflateDecoder::new(data).read_to_end(&mut out),
        Compression::Zlib => flate2::read::ZlibDecoder::new(data).read_to_end(&mut out),
    };
    read.map_err(|e| DecodeError::Decompression(format!("{}: {}", codec, e)))?;

    Ok(Bytes::from(out))
}

/// Undo transport encoding, then compression.
pub fn unwrap_payload(data: &[u8], transport: Transport, compression: Compression) -> Result<Bytes> {
    match transport {
        Transport::Binary => decompress(data, compression),
        Transport::Base64 => {
            let text: Vec<u8> = data
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            let binary = base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| DecodeError::Base64(e.to_string()))?;
            decompress(&binary, compression)
        }
    }
}
