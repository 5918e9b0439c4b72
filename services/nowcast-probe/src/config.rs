//! Source definitions loaded from YAML.
//!
//! A sources file lists one or more source sets. Each set optionally
//! declares the area it covers, an analysis source and a forecast source.
//! The first set covering the query point is used.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use nowcast::{
    FileProvider, HttpProvider, ProviderChain, Providers, RasterProvider, TileSource, UrlTemplate,
};
use radar_common::{grids, BoundingBox, GeoPoint, GridMetadata, ProductKind};
use raster_decoder::RasterEncoding;

/// Root of a sources YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub source_sets: Vec<SourceSetConfig>,
}

/// Analysis and forecast sources for one coverage area.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSetConfig {
    pub name: String,
    /// Area served by this set; absent means everywhere.
    #[serde(default)]
    pub coverage: Option<BoundingBox>,
    pub analysis: SourceConfig,
    #[serde(default)]
    pub forecast: Option<SourceConfig>,
}

/// One product and its ordered endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub product: ProductKind,
    /// Tried in order: primary first, then backups.
    pub endpoints: Vec<EndpointConfig>,
    /// Named grid for RADOLAN frames.
    #[serde(default)]
    pub grid: Option<GridPreset>,
    /// Full decoding description; takes precedence over `grid`.
    #[serde(default)]
    pub encoding: Option<RasterEncoding>,
    #[serde(default)]
    pub published_leads: Option<Vec<u32>>,
    #[serde(default)]
    pub accumulation_minutes: Option<u32>,
    #[serde(default)]
    pub point_cell_delta: Option<f64>,
    #[serde(default)]
    pub issue_lag_minutes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: EndpointKind,
    /// URL or path template with `{valid}`, `{issued}`, `{lead}`, `{lat}`, `{lon}`.
    pub url: String,
    #[serde(default)]
    pub time_format: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    #[default]
    Http,
    File,
}

/// Built-in RADOLAN grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridPreset {
    RadolanNational,
    RadolanExtended,
}

impl GridPreset {
    pub fn grid(&self) -> GridMetadata {
        match self {
            Self::RadolanNational => grids::radolan_national(),
            Self::RadolanExtended => grids::radolan_extended(),
        }
    }
}

impl SourcesConfig {
    /// Load and validate a sources file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sources file: {}", path.display()))?;

        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse sources file: {}", path.display()))?;

        info!(
            path = %path.display(),
            sets = config.source_sets.len(),
            "Loaded source configuration"
        );
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: SourcesConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_sets.is_empty() {
            bail!("no source sets configured");
        }
        for set in &self.source_sets {
            if set.analysis.product != ProductKind::Analysis {
                bail!(
                    "source set '{}': analysis source must have product 'analysis', got '{}'",
                    set.name,
                    set.analysis.product
                );
            }
            set.analysis.validate()?;

            if let Some(forecast) = &set.forecast {
                if !forecast.product.is_forecast() {
                    bail!(
                        "source set '{}': forecast source '{}' has non-forecast product '{}'",
                        set.name,
                        forecast.name,
                        forecast.product
                    );
                }
                forecast.validate()?;
            }
        }
        Ok(())
    }

    /// First set whose coverage contains the point.
    pub fn select_for(&self, point: GeoPoint) -> Option<&SourceSetConfig> {
        let selected = self
            .source_sets
            .iter()
            .find(|set| set.coverage.map_or(true, |bbox| bbox.contains(point)));

        if let Some(set) = selected {
            debug!(set = %set.name, lat = point.lat, lon = point.lon, "Selected source set");
        }
        selected
    }
}

impl SourceSetConfig {
    /// Instantiate providers for this set.
    pub fn build_providers(&self, request_timeout: Duration) -> Result<Providers> {
        let analysis = self.analysis.build(request_timeout)?;
        Ok(match &self.forecast {
            Some(forecast) => Providers::new(analysis, forecast.build(request_timeout)?),
            None => Providers::analysis_only(analysis),
        })
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            bail!("source '{}' has no endpoints", self.name);
        }
        if self.encoding.is_none() && self.grid.is_none() {
            bail!("source '{}' needs either 'encoding' or 'grid'", self.name);
        }
        for endpoint in &self.endpoints {
            if let Err(e) = endpoint.template().validate() {
                bail!("source '{}': {}", self.name, e);
            }
        }
        if let Some(delta) = self.point_cell_delta {
            if !(delta > 0.0) {
                bail!("source '{}': point_cell_delta must be positive", self.name);
            }
        }
        Ok(())
    }

    pub fn raster_encoding(&self) -> Result<RasterEncoding> {
        match (&self.encoding, self.grid) {
            (Some(encoding), _) => Ok(encoding.clone()),
            (None, Some(preset)) => Ok(RasterEncoding::radolan(preset.grid())),
            (None, None) => bail!("source '{}' needs either 'encoding' or 'grid'", self.name),
        }
    }

    pub fn build(&self, request_timeout: Duration) -> Result<TileSource> {
        let mut chain = ProviderChain::new();
        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            let name = endpoint
                .name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", self.name, idx));
            chain = chain.with(endpoint.build(name, request_timeout)?);
        }

        let mut source = TileSource::new(
            self.name.clone(),
            self.product,
            self.raster_encoding()?,
            chain,
        )
        .with_issue_lag(self.issue_lag_minutes);

        let accumulation = match (self.accumulation_minutes, self.product) {
            (Some(minutes), _) => Some(minutes),
            (None, ProductKind::Analysis) => Some(5),
            (None, _) => None,
        };
        if let Some(minutes) = accumulation {
            source = source.with_accumulation(minutes);
        }
        if let Some(leads) = &self.published_leads {
            source = source.with_published_leads(leads.clone());
        }
        if let Some(delta) = self.point_cell_delta {
            source = source.with_point_cell(delta);
        }

        debug!(
            source = %self.name,
            product = %self.product,
            endpoints = ?source.chain.names(),
            "Built tile source"
        );
        Ok(source)
    }
}

impl EndpointConfig {
    fn template(&self) -> UrlTemplate {
        let template = UrlTemplate::new(self.url.clone());
        match &self.time_format {
            Some(format) => template.with_time_format(format.clone()),
            None => template,
        }
    }

    fn build(&self, name: String, request_timeout: Duration) -> Result<Arc<dyn RasterProvider>> {
        let template = self.template();

        Ok(match self.kind {
            EndpointKind::Http => Arc::new(
                HttpProvider::new(name.clone(), template, request_timeout)
                    .with_context(|| format!("Failed to create HTTP provider '{}'", name))?,
            ),
            EndpointKind::File => Arc::new(FileProvider::new(name, template)),
        })
    }
}
