//! Filesystem source loader for `file://` URLs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use url::Url;

use super::SourceLoader;
use crate::models::LoadedSource;

/// Reads `file://` URLs from local disk.
///
/// Files are returned as plain text; this loader never declares extra files
/// or dependencies on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceLoader;

impl FsSourceLoader {
    /// Create a filesystem loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceLoader for FsSourceLoader {
    async fn load_source(&self, url: &str) -> Result<LoadedSource> {
        let path = Url::parse(url)
            .with_context(|| format!("Invalid file URL: {url}"))?
            .to_file_path()
            .map_err(|()| anyhow::anyhow!("URL does not name a local file: {url}"))?;

        tracing::debug!("Reading {}", path.display());
        let source = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Ok(LoadedSource::text(source))
    }
}
