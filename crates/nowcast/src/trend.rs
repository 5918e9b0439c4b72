//! Daily per-region trend tables.
//!
//! Some outlooks are published once per day as a JSON object keyed by
//! region code:
//!
//! ```json
//! { "805314000": { "Name": "Kreis Bonn", "Trend": [0, 1, 1, 2] } }
//! ```
//!
//! Tables are loaded through a [`TableLoader`] and kept in a
//! [`DailyCache`] until the date changes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cache::DailyCache;
use crate::error::{FetchError, FetchResult};

/// One region's entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Trend")]
    pub trend: serde_json::Value,
}

/// A region code with its entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTrend {
    pub code: String,
    #[serde(flatten)]
    pub entry: TrendEntry,
}

/// Table of trends keyed by region code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrendTable {
    entries: BTreeMap<String, TrendEntry>,
}

impl TrendTable {
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry (by code) whose name contains `region`.
    pub fn lookup(&self, region: &str) -> Option<RegionTrend> {
        if region.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(_, entry)| entry.name.contains(region))
            .map(|(code, entry)| RegionTrend {
                code: code.clone(),
                entry: entry.clone(),
            })
    }
}

/// Source of the table published for a date.
#[async_trait]
pub trait TableLoader: Send + Sync {
    async fn load(&self, date: NaiveDate) -> FetchResult<TrendTable>;
}

/// Loads tables over HTTP; `{date}` in the template becomes `YYYYMMDD`.
pub struct HttpTableLoader {
    client: Client,
    url_template: String,
}

impl HttpTableLoader {
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        self.url_template
            .replace("{date}", &date.format("%Y%m%d").to_string())
    }
}

#[async_trait]
impl TableLoader for HttpTableLoader {
    #[instrument(skip(self))]
    async fn load(&self, date: NaiveDate) -> FetchResult<TrendTable> {
        let url = self.url_for(date);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        let table = TrendTable::from_json(&body)
            .map_err(|e| FetchError::transport(format!("invalid trend table: {}", e)))?;
        debug!(regions = table.len(), "Loaded trend table");
        Ok(table)
    }
}

/// Region trend lookups backed by a same-day cache.
pub struct TrendService<L> {
    loader: L,
    cache: DailyCache<Arc<TrendTable>>,
}

impl<L: TableLoader> TrendService<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            cache: DailyCache::new(),
        }
    }

    /// Trend for the first region whose name contains `region`.
    pub async fn trend_for(&self, today: NaiveDate, region: &str) -> FetchResult<Option<RegionTrend>> {
        let table = self
            .cache
            .get_or_try_load(today, || async {
                self.loader.load(today).await.map(Arc::new)
            })
            .await?;
        Ok(table.lookup(region))
    }

    pub fn cache(&self) -> &DailyCache<Arc<TrendTable>> {
        &self.cache
    }
}
