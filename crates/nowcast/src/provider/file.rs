//! Local file provider for replaying archived products.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::provider::{RasterProvider, StepRequest, UrlTemplate};

/// Reads payloads from paths rendered from a template.
pub struct FileProvider {
    name: String,
    template: UrlTemplate,
}

impl FileProvider {
    pub fn new(name: impl Into<String>, template: UrlTemplate) -> Self {
        Self {
            name: name.into(),
            template,
        }
    }

    pub fn path_for(&self, request: &StepRequest) -> FetchResult<PathBuf> {
        self.template.render(request).map(PathBuf::from)
    }
}

#[async_trait]
impl RasterProvider for FileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_tile(&self, request: &StepRequest) -> FetchResult<Bytes> {
        let path = self.path_for(request)?;
        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!(path = %path.display(), size = data.len(), "Read tile from disk");
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotPublished {
                offset_minutes: request.offset_minutes,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
