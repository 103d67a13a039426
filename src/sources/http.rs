//! HTTP source loader for `http://` and `https://` URLs.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::SourceLoader;
use crate::constants::USER_AGENT;
use crate::models::LoadedSource;

/// Fetches sources over HTTP with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSourceLoader {
    client: reqwest::Client,
}

impl HttpSourceLoader {
    /// Create a loader with the crate's user agent.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Create a loader around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpSourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceLoader for HttpSourceLoader {
    async fn load_source(&self, url: &str) -> Result<LoadedSource> {
        tracing::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("Server rejected request for {url}"))?;

        let source =
            response.text().await.with_context(|| format!("Failed to read body of {url}"))?;
        Ok(LoadedSource::text(source))
    }
}
