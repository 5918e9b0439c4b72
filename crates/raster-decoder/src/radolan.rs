//! RADOLAN binary composite frames.
//!
//! A frame is an ASCII header terminated by ETX (0x03), followed by the
//! packed grid. Header layout:
//!
//! ```text
//! RW 081050 10000 0120 BY1620130 VS 3 SW 2.19.2 PR E-01 INT 60 GP 900x 900 MS ...
//! ^^ ^^^^^^ ^^^^^ ^^^^
//! |  ddHHMM  WMO  MMYY
//! product
//! ```
//!
//! Rain products store little-endian 16-bit words: the low 12 bits hold
//! the value, `0x2000` flags no-data, `0x4000` a negative sign and
//! `0x8000` clutter. Reflectivity products (`RX`, `WX`, `EX`) store one
//! byte per cell as `dBZ = raw / 2 - 32.5`.
//!
//! Rows are written south to north.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tracing::debug;

use crate::{DecodeError, Result};

const ETX: u8 = 0x03;

const VALUE_MASK: u16 = 0x0fff;
const NO_DATA_FLAG: u16 = 0x2000;
const NEGATIVE_FLAG: u16 = 0x4000;
const CLUTTER_FLAG: u16 = 0x8000;

const BYTE_NO_DATA: u8 = 250;
const BYTE_CLUTTER: u8 = 249;

/// Largest accepted `GP` side; real composites stay well below this.
const MAX_GRID_SIDE: usize = 10_000;

/// Header tokens in the order they may appear.
const TOKENS: &[&str] = &["BY", "VS", "SW", "PR", "INT", "GP", "VV", "MF", "QN"];

/// Parsed RADOLAN header.
#[derive(Debug, Clone, PartialEq)]
pub struct RadolanHeader {
    /// Two-letter product id, e.g. `RW`, `RV`, `RX`.
    pub product: String,
    /// Nominal product time.
    pub issued: Option<DateTime<Utc>>,
    /// Decimal exponent applied to raw values (`PR E-02` → -2).
    pub precision: i32,
    pub rows: usize,
    pub cols: usize,
    /// Forecast lead time in minutes (`VV`), 0 for analyses.
    pub lead_minutes: u32,
    /// Accumulation interval in minutes (`INT`), if present.
    pub interval_minutes: Option<u32>,
    /// Length of the header including the ETX byte.
    pub header_len: usize,
}

impl RadolanHeader {
    /// Instant the data is valid for: issue time plus lead.
    pub fn valid_at(&self) -> Option<DateTime<Utc>> {
        self.issued
            .map(|t| t + Duration::minutes(self.lead_minutes as i64))
    }

    /// One byte per cell (reflectivity products).
    pub fn is_byte_product(&self) -> bool {
        matches!(self.product.as_str(), "RX" | "WX" | "EX")
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Parse the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let etx = data
            .iter()
            .position(|&b| b == ETX)
            .ok_or_else(|| DecodeError::InvalidHeader("missing ETX terminator".to_string()))?;

        let raw = &data[..etx];
        if !raw.is_ascii() {
            return Err(DecodeError::InvalidHeader("header is not ASCII".to_string()));
        }
        let text = std::str::from_utf8(raw)
            .map_err(|_| DecodeError::InvalidHeader("header is not ASCII".to_string()))?;

        if text.len() < 17 {
            return Err(DecodeError::InvalidHeader(format!(
                "header too short: {} bytes",
                text.len()
            )));
        }

        let product = text[..2].to_string();
        if !product.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DecodeError::UnsupportedProduct(product));
        }

        let issued = parse_timestamp(&text[2..8], &text[13..17]);

        let body = &text[17..];
        let tokens = tokenize(body);
        let field = |name: &str| -> Option<&str> {
            tokens.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
        };

        let precision = match field("PR") {
            Some(value) => parse_precision(value)?,
            None => 0,
        };

        let (rows, cols) = match field("GP") {
            Some(value) => parse_dimensions(value)?,
            None => (900, 900),
        };

        let lead_minutes = match field("VV") {
            Some(value) => value.parse::<u32>().map_err(|_| {
                DecodeError::InvalidHeader(format!("invalid VV field: '{}'", value))
            })?,
            None => 0,
        };

        let interval_minutes = field("INT").and_then(|value| value.parse::<u32>().ok());

        Ok(Self {
            product,
            issued,
            precision,
            rows,
            cols,
            lead_minutes,
            interval_minutes,
            header_len: etx + 1,
        })
    }
}

/// Header plus decoded values (row-major, south row first).
#[derive(Debug, Clone)]
pub struct RadolanFrame {
    pub header: RadolanHeader,
    pub values: Vec<f32>,
}

impl RadolanFrame {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = RadolanHeader::parse(data)?;
        let body = &data[header.header_len..];
        let count = header.cell_count();

        let values = if header.is_byte_product() {
            unpack_bytes(body, count)?
        } else {
            unpack_words(body, count, header.precision)?
        };

        debug!(
            product = %header.product,
            rows = header.rows,
            cols = header.cols,
            precision = header.precision,
            lead_minutes = header.lead_minutes,
            "Parsed RADOLAN frame"
        );

        Ok(Self { header, values })
    }
}

fn unpack_words(body: &[u8], count: usize, precision: i32) -> Result<Vec<f32>> {
    let expected = count
        .checked_mul(2)
        .ok_or_else(|| DecodeError::InvalidHeader(format!("cell count overflows: {}", count)))?;
    if body.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: body.len(),
        });
    }

    let factor = 10f32.powi(precision);
    Ok(body[..expected]
        .chunks_exact(2)
        .map(|pair| {
            let word = u16::from_le_bytes([pair[0], pair[1]]);
            if word & NO_DATA_FLAG != 0 {
                return f32::NAN;
            }
            if word & CLUTTER_FLAG != 0 {
                return 0.0;
            }
            let value = (word & VALUE_MASK) as f32 * factor;
            if word & NEGATIVE_FLAG != 0 {
                -value
            } else {
                value
            }
        })
        .collect())
}

fn unpack_bytes(body: &[u8], count: usize) -> Result<Vec<f32>> {
    if body.len() < count {
        return Err(DecodeError::Truncated {
            expected: count,
            actual: body.len(),
        });
    }

    Ok(body[..count]
        .iter()
        .map(|&raw| match raw {
            BYTE_NO_DATA => f32::NAN,
            BYTE_CLUTTER => 0.0,
            _ => raw as f32 / 2.0 - 32.5,
        })
        .collect())
}

/// Split the header body into `(token, value)` pairs, stopping at `MS`.
fn tokenize(body: &str) -> Vec<(&'static str, &str)> {
    let body = body.find("MS").map_or(body, |pos| &body[..pos]);

    let mut found: Vec<(usize, &'static str)> = Vec::new();
    for &token in TOKENS {
        if let Some(pos) = body.find(token) {
            found.push((pos, token));
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut out = Vec::with_capacity(found.len());
    for (i, &(pos, token)) in found.iter().enumerate() {
        let end = found.get(i + 1).map(|(p, _)| *p).unwrap_or(body.len());
        let start = pos + token.len();
        if start <= end {
            out.push((token, body[start..end].trim()));
        }
    }
    out
}

fn parse_timestamp(ddhhmm: &str, mmyy: &str) -> Option<DateTime<Utc>> {
    let day: u32 = ddhhmm.get(0..2)?.parse().ok()?;
    let hour: u32 = ddhhmm.get(2..4)?.parse().ok()?;
    let minute: u32 = ddhhmm.get(4..6)?.parse().ok()?;
    let month: u32 = mmyy.get(0..2)?.parse().ok()?;
    let year: i32 = mmyy.get(2..4)?.parse::<i32>().ok()? + 2000;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Utc.from_local_datetime(&naive).single()
}

/// `E-02` → -2
fn parse_precision(value: &str) -> Result<i32> {
    value
        .trim()
        .strip_prefix('E')
        .and_then(|exp| exp.parse::<i32>().ok())
        .ok_or_else(|| DecodeError::InvalidHeader(format!("invalid PR field: '{}'", value)))
}

/// `900x 900` → (rows, cols)
fn parse_dimensions(value: &str) -> Result<(usize, usize)> {
    let invalid = || DecodeError::InvalidHeader(format!("invalid GP field: '{}'", value));

    let (rows, cols) = value.split_once('x').ok_or_else(invalid)?;
    let rows: usize = rows.trim().parse().map_err(|_| invalid())?;
    let cols: usize = cols.trim().parse().map_err(|_| invalid())?;
    if rows == 0 || cols == 0 || rows > MAX_GRID_SIDE || cols > MAX_GRID_SIDE {
        return Err(invalid());
    }
    Ok((rows, cols))
}
