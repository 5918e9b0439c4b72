//! HTTP tile provider with URL templates.

use std::fmt::Write;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{FetchError, FetchResult};
use crate::provider::{RasterProvider, StepRequest};

fn default_time_format() -> String {
    "%y%m%d%H%M".to_string()
}

/// URL (or path) template for one time step.
///
/// Placeholders:
/// - `{valid}` / `{issued}`: instants formatted with `time_format`
/// - `{date}`: valid date as `YYYYMMDD`
/// - `{lead}`: lead time in minutes, three digits (`060`)
/// - `{lat}` / `{lon}`: query point, four decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTemplate {
    pub template: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            time_format: default_time_format(),
        }
    }

    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    /// Reject a `time_format` chrono cannot render.
    pub fn validate(&self) -> Result<(), String> {
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid time_format '{}'", self.time_format));
        }
        Ok(())
    }

    pub fn render(&self, request: &StepRequest) -> FetchResult<String> {
        let valid = self.format_instant(request.valid_at)?;
        let issued = self.format_instant(request.issued)?;
        Ok(self
            .template
            .replace("{valid}", &valid)
            .replace("{issued}", &issued)
            .replace("{date}", &request.valid_at.format("%Y%m%d").to_string())
            .replace("{lead}", &format!("{:03}", request.lead_minutes().max(0)))
            .replace("{lat}", &format!("{:.4}", request.point.lat))
            .replace("{lon}", &format!("{:.4}", request.point.lon)))
    }

    fn format_instant(&self, instant: DateTime<Utc>) -> FetchResult<String> {
        let mut out = String::new();
        write!(out, "{}", instant.format(&self.time_format)).map_err(|_| {
            FetchError::InvalidTemplate(format!("cannot render time_format '{}'", self.time_format))
        })?;
        Ok(out)
    }
}

/// Fetches payloads over HTTP(S).
pub struct HttpProvider {
    name: String,
    client: Client,
    template: UrlTemplate,
}

impl HttpProvider {
    /// Create a provider with its own client.
    ///
    /// `request_timeout` is a transport-level cap; the chain applies the
    /// per-attempt timeout on top.
    pub fn new(
        name: impl Into<String>,
        template: UrlTemplate,
        request_timeout: Duration,
    ) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FetchError::transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(name, template, client))
    }

    /// Share a client between providers.
    pub fn with_client(name: impl Into<String>, template: UrlTemplate, client: Client) -> Self {
        Self {
            name: name.into(),
            client,
            template,
        }
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }
}

#[async_trait]
impl RasterProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(provider = %self.name, offset = request.offset_minutes))]
    async fn fetch_tile(&self, request: &StepRequest) -> FetchResult<Bytes> {
        let url = self.template.render(request)?;
        debug!(url = %url, "Requesting tile");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotPublished {
                offset_minutes: request.offset_minutes,
            });
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await?;
        debug!(size = bytes.len(), "Downloaded tile");
        Ok(bytes)
    }
}
