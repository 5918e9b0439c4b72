//! Raster providers and ordered fallback chains.
//!
//! A [`RasterProvider`] returns the raw (possibly compressed) payload for
//! one time step. A [`ProviderChain`] tries its providers in order, each
//! attempt bounded by the same timeout, and stops at the first success.

pub mod file;
pub mod http;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, warn};

use radar_common::{grids, GeoPoint, ProductKind};
use raster_decoder::{RasterEncoding, RasterFormat};

use crate::error::{FetchError, FetchResult};

pub use file::FileProvider;
pub use http::{HttpProvider, UrlTemplate};

/// One time step to fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRequest {
    /// Query point, for single-pixel sources.
    pub point: GeoPoint,
    /// Run/issue time of the product (equals `valid_at` for analyses).
    pub issued: DateTime<Utc>,
    /// Instant the requested data is valid for.
    pub valid_at: DateTime<Utc>,
    /// Minutes from the current bucket; negative for past steps.
    pub offset_minutes: i64,
}

impl StepRequest {
    /// Forecast lead time in minutes.
    pub fn lead_minutes(&self) -> i64 {
        (self.valid_at - self.issued).num_minutes()
    }
}

/// Capability to fetch one raw tile payload.
#[async_trait]
pub trait RasterProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn fetch_tile(&self, request: &StepRequest) -> FetchResult<Bytes>;
}

/// Payload plus the provider that delivered it.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Bytes,
    pub provider: String,
    /// Attempts made, including the successful one.
    pub attempts: usize,
}

/// Every provider in a chain failed.
#[derive(Debug, Clone, Default)]
pub struct ChainFailure {
    /// `(provider name, error)` per attempt, in order.
    pub errors: Vec<(String, FetchError)>,
}

impl ChainFailure {
    pub fn attempts(&self) -> usize {
        self.errors.len()
    }
}

impl std::fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "no providers configured");
        }
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(name, err)| format!("{}: {}", name, err))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Ordered list of providers tried until one succeeds.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn RasterProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(provider: Arc<dyn RasterProvider>) -> Self {
        Self {
            providers: vec![provider],
        }
    }

    pub fn with(mut self, provider: Arc<dyn RasterProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Try each provider in order; first success wins.
    pub async fn fetch(
        &self,
        request: &StepRequest,
        attempt_timeout: Duration,
    ) -> Result<Fetched, ChainFailure> {
        let mut failure = ChainFailure::default();

        for provider in &self.providers {
            let result =
                match tokio::time::timeout(attempt_timeout, provider.fetch_tile(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(attempt_timeout)),
                };

            match result {
                Ok(bytes) => {
                    debug!(
                        provider = provider.name(),
                        offset = request.offset_minutes,
                        size = bytes.len(),
                        "Fetched tile"
                    );
                    return Ok(Fetched {
                        bytes,
                        provider: provider.name().to_string(),
                        attempts: failure.attempts() + 1,
                    });
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        offset = request.offset_minutes,
                        error = %e,
                        "Fetch attempt failed"
                    );
                    failure.errors.push((provider.name().to_string(), e));
                }
            }
        }

        Err(failure)
    }
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.names())
            .finish()
    }
}

/// A product together with where to fetch it and how to decode it.
#[derive(Debug, Clone)]
pub struct TileSource {
    pub name: String,
    pub product: ProductKind,
    pub chain: ProviderChain,
    pub encoding: RasterEncoding,
    /// Forecast leads (minutes) actually published; `None` means every step.
    pub published_leads: Option<Vec<u32>>,
    /// Values are accumulations over this many minutes and are scaled to mm/h.
    pub accumulation_minutes: Option<u32>,
    /// Single-pixel source: the tile covers a cell of this half-size (degrees)
    /// around the query point.
    pub point_cell_delta: Option<f64>,
    /// Minutes between a bucket and the newest run available at that time.
    pub issue_lag_minutes: u32,
}

impl TileSource {
    pub fn new(
        name: impl Into<String>,
        product: ProductKind,
        encoding: RasterEncoding,
        chain: ProviderChain,
    ) -> Self {
        Self {
            name: name.into(),
            product,
            chain,
            encoding,
            published_leads: None,
            accumulation_minutes: None,
            point_cell_delta: None,
            issue_lag_minutes: 0,
        }
    }

    /// Past observations stored as 5-minute accumulations (mm).
    pub fn analysis(name: impl Into<String>, encoding: RasterEncoding, chain: ProviderChain) -> Self {
        Self::new(name, ProductKind::Analysis, encoding, chain).with_accumulation(5)
    }

    pub fn with_published_leads(mut self, leads: Vec<u32>) -> Self {
        self.published_leads = Some(leads);
        self
    }

    pub fn with_accumulation(mut self, minutes: u32) -> Self {
        self.accumulation_minutes = Some(minutes);
        self
    }

    pub fn with_point_cell(mut self, delta: f64) -> Self {
        self.point_cell_delta = Some(delta);
        self
    }

    pub fn with_issue_lag(mut self, minutes: u32) -> Self {
        self.issue_lag_minutes = minutes;
        self
    }

    /// Whether a tile exists for this lead, or must be interpolated.
    pub fn publishes(&self, lead_minutes: i64) -> bool {
        match &self.published_leads {
            None => true,
            Some(leads) => leads.iter().any(|&l| l as i64 == lead_minutes),
        }
    }

    /// Issue time of the run used for a bucket.
    pub fn issued_for(&self, bucket: DateTime<Utc>) -> DateTime<Utc> {
        bucket - ChronoDuration::minutes(self.issue_lag_minutes as i64)
    }

    /// Decoding instructions for a query point.
    ///
    /// Single-pixel sources get a 1x1 grid centred on the point.
    pub fn encoding_for(&self, point: GeoPoint) -> RasterEncoding {
        match (self.point_cell_delta, &self.encoding.format) {
            (Some(delta), RasterFormat::Raw { sample, .. }) => RasterEncoding {
                format: RasterFormat::Raw {
                    sample: *sample,
                    grid: grids::point_cell(point, delta),
                },
                ..self.encoding.clone()
            },
            _ => self.encoding.clone(),
        }
    }

    /// Convert a sampled value to mm/h (accumulations only).
    pub fn to_rate(&self, value: f64) -> f64 {
        match self.accumulation_minutes {
            Some(minutes) if minutes > 0 => value * 60.0 / minutes as f64,
            _ => value,
        }
    }
}

/// The two sources a forecast query draws from.
#[derive(Debug, Clone)]
pub struct Providers {
    pub analysis: TileSource,
    /// Without a forecast source only the past window is assembled.
    pub forecast: Option<TileSource>,
}

impl Providers {
    pub fn new(analysis: TileSource, forecast: TileSource) -> Self {
        Self {
            analysis,
            forecast: Some(forecast),
        }
    }

    pub fn analysis_only(analysis: TileSource) -> Self {
        Self {
            analysis,
            forecast: None,
        }
    }
}
