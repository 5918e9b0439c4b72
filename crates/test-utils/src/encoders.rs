//! Payload encoders mirroring what upstream radar providers publish.
//!
//! These produce raw bytes only; decoding lives in `raster-decoder`.

use std::io::Write;

use base64::Engine;
use chrono::{DateTime, Datelike, Timelike, Utc};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;

/// Quantize physical values to `u8` with `raw = round(value / scale)`.
pub fn encode_u8(values: &[f32], scale: f32) -> Vec<u8> {
    values
        .iter()
        .map(|v| (v / scale).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Quantize physical values to little-endian `u16`.
pub fn encode_u16_le(values: &[f32], scale: f32) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| ((v / scale).round().clamp(0.0, 65535.0) as u16).to_le_bytes())
        .collect()
}

/// Convert `f32` to binary16 bits, truncating extra mantissa bits.
pub fn f32_to_f16(value: f32) -> u16 {
    if value.is_nan() {
        return 0x7e00;
    }

    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32 - 127;
    let mantissa = bits & 0x007f_ffff;

    if value.is_infinite() || exponent > 15 {
        return sign | 0x7c00;
    }
    if exponent >= -14 {
        let half_exp = ((exponent + 15) as u16) << 10;
        return sign | half_exp | (mantissa >> 13) as u16;
    }
    if exponent >= -24 {
        // Subnormal: implicit leading bit becomes explicit
        let full = mantissa | 0x0080_0000;
        let shift = (-exponent - 14 + 13) as u32;
        return sign | (full >> shift) as u16;
    }
    sign
}

/// Encode values as little-endian half floats.
pub fn encode_f16_le(values: &[f32]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&v| f32_to_f16(v).to_le_bytes())
        .collect()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Raw deflate stream without zlib framing.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Builds RADOLAN binary frames for tests.
///
/// ```ignore
/// let bytes = RadolanFrameBuilder::new("RV", issued)
///     .dimensions(2, 2)
///     .precision(-2)
///     .lead_minutes(60)
///     .build(&[0.5, 1.0, 0.0, 2.25]);
/// ```
#[derive(Debug, Clone)]
pub struct RadolanFrameBuilder {
    product: String,
    issued: DateTime<Utc>,
    rows: usize,
    cols: usize,
    precision: i32,
    lead_minutes: Option<u32>,
    interval_minutes: u32,
}

impl RadolanFrameBuilder {
    pub fn new(product: &str, issued: DateTime<Utc>) -> Self {
        Self {
            product: product.to_string(),
            issued,
            rows: 900,
            cols: 900,
            precision: -2,
            lead_minutes: None,
            interval_minutes: 5,
        }
    }

    pub fn dimensions(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn precision(mut self, precision: i32) -> Self {
        self.precision = precision;
        self
    }

    pub fn lead_minutes(mut self, lead: u32) -> Self {
        self.lead_minutes = Some(lead);
        self
    }

    pub fn interval_minutes(mut self, interval: u32) -> Self {
        self.interval_minutes = interval;
        self
    }

    pub fn header(&self) -> String {
        let t = self.issued;
        let mut header = format!(
            "{}{:02}{:02}{:02}10000{:02}{:02}BY{:7}VS 3SW   2.28.1PR E{:03}INT{:4}GP{:4}x{:4}",
            self.product,
            t.day(),
            t.hour(),
            t.minute(),
            t.month(),
            t.year() % 100,
            0,
            self.precision,
            self.interval_minutes,
            self.rows,
            self.cols,
        );
        if let Some(lead) = self.lead_minutes {
            header.push_str(&format!("VV {:03}", lead));
        }
        header.push_str("MS 10<tst,xyz>");
        header
    }

    /// Build a 16-bit word frame from physical values.
    ///
    /// NaN becomes the no-data flag and negatives set the sign bit.
    pub fn build(&self, values: &[f32]) -> Vec<u8> {
        let factor = 10f32.powi(-self.precision);
        let mut data = self.header().into_bytes();
        data.push(0x03);
        for &v in values {
            let word: u16 = if v.is_nan() {
                0x2000 | 0x0fff
            } else {
                let raw = ((v.abs() * factor).round() as u16) & 0x0fff;
                if v < 0.0 {
                    raw | 0x4000
                } else {
                    raw
                }
            };
            data.extend_from_slice(&word.to_le_bytes());
        }
        data
    }

    /// Build a one-byte reflectivity frame (`RX` style) from dBZ values.
    pub fn build_bytes(&self, dbz: &[f32]) -> Vec<u8> {
        let mut data = self.header().into_bytes();
        data.push(0x03);
        data.extend(dbz.iter().map(|&v| {
            if v.is_nan() {
                250
            } else {
                ((v + 32.5) * 2.0).round().clamp(0.0, 248.0) as u8
            }
        }));
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_f32_to_f16_exact_values() {
        assert_eq!(f32_to_f16(1.0), 0x3c00);
        assert_eq!(f32_to_f16(-2.0), 0xc000);
        assert_eq!(f32_to_f16(0.0), 0x0000);
        assert_eq!(f32_to_f16(65504.0), 0x7bff);
        assert_eq!(f32_to_f16(f32::INFINITY), 0x7c00);
        assert_eq!(f32_to_f16(f32::NEG_INFINITY), 0xfc00);
        assert_eq!(f32_to_f16(2.0f32.powi(-24)), 0x0001);
    }

    #[test]
    fn test_encode_u8_rounds() {
        assert_eq!(encode_u8(&[0.0, 1.04, 300.0], 0.1), vec![0, 10, 255]);
    }

    #[test]
    fn test_radolan_header_layout() {
        let issued = Utc.with_ymd_and_hms(2024, 3, 19, 12, 5, 0).unwrap();
        let header = RadolanFrameBuilder::new("RV", issued)
            .dimensions(2, 3)
            .lead_minutes(60)
            .header();
        assert!(header.starts_with("RV191205100000324"));
        assert!(header.contains("PR E-02"));
        assert!(header.contains("GP   2x   3"));
        assert!(header.contains("VV 060"));
    }

    #[test]
    fn test_radolan_build_length() {
        let issued = Utc.with_ymd_and_hms(2024, 3, 19, 12, 5, 0).unwrap();
        let builder = RadolanFrameBuilder::new("RW", issued).dimensions(1, 2);
        let frame = builder.build(&[1.0, f32::NAN]);
        assert_eq!(frame.len(), builder.header().len() + 1 + 4);
    }
}
