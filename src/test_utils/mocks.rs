//! In-memory collaborator implementations.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::{Code, LoadedSource, TransformedSource, TransformedSources, VariantCode};
use serde_json::Value;

use crate::sources::{CodeMetaLoader, SourceLoader, SourceParser, TransformSource, VariantMetaLoader};
use crate::utils::url_paths::file_name_from_url;

/// Per-key call counter.
#[derive(Debug, Default)]
struct CallLog(DashMap<String, usize>);

impl CallLog {
    fn record(&self, key: &str) {
        *self.0.entry(key.to_string()).or_insert(0) += 1;
    }

    fn get(&self, key: &str) -> usize {
        self.0.get(key).map_or(0, |count| *count)
    }

    fn total(&self) -> usize {
        self.0.iter().map(|entry| *entry.value()).sum()
    }
}

/// Source loader serving a fixed URL to [`LoadedSource`] table.
#[derive(Debug, Default)]
pub struct MockSourceLoader {
    sources: HashMap<String, std::result::Result<LoadedSource, String>>,
    latency: Option<Duration>,
    calls: CallLog,
}

impl MockSourceLoader {
    /// An empty table; every request fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `source` for `url`.
    #[must_use]
    pub fn with_source(mut self, url: impl Into<String>, source: LoadedSource) -> Self {
        self.sources.insert(url.into(), Ok(source));
        self
    }

    /// Serve plain text for `url`.
    #[must_use]
    pub fn with_text(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_source(url, LoadedSource::text(text))
    }

    /// Fail every request for `url` with `message`.
    #[must_use]
    pub fn with_failure(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.sources.insert(url.into(), Err(message.into()));
        self
    }

    /// Sleep before answering, to widen race windows.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of requests made for `url`.
    #[must_use]
    pub fn calls(&self, url: &str) -> usize {
        self.calls.get(url)
    }

    /// Number of requests made for any URL.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.total()
    }
}

#[async_trait]
impl SourceLoader for MockSourceLoader {
    async fn load_source(&self, url: &str) -> Result<LoadedSource> {
        self.calls.record(url);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.sources.get(url) {
            Some(Ok(source)) => Ok(source.clone()),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("no source registered for {url}")),
        }
    }
}

/// Variant metadata loader serving fixed definitions by URL.
///
/// URLs without a registered definition resolve to
/// [`VariantCode::from_url`], which is what a loader does when the URL points
/// straight at the main file.
#[derive(Debug, Default)]
pub struct MockVariantMetaLoader {
    variants: HashMap<String, VariantCode>,
    failures: HashMap<String, String>,
    calls: CallLog,
}

impl MockVariantMetaLoader {
    /// Loader with no registered definitions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `variant` for `url`.
    #[must_use]
    pub fn with_variant(mut self, url: impl Into<String>, variant: VariantCode) -> Self {
        self.variants.insert(url.into(), variant);
        self
    }

    /// Fail requests for `url`.
    #[must_use]
    pub fn with_failure(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(url.into(), message.into());
        self
    }

    /// Number of requests made for `url`.
    #[must_use]
    pub fn calls(&self, url: &str) -> usize {
        self.calls.get(url)
    }
}

#[async_trait]
impl VariantMetaLoader for MockVariantMetaLoader {
    async fn load_variant_meta(&self, _variant_name: &str, url: &str) -> Result<VariantCode> {
        self.calls.record(url);
        if let Some(message) = self.failures.get(url) {
            return Err(anyhow!("{message}"));
        }
        Ok(self.variants.get(url).cloned().unwrap_or_else(|| VariantCode::from_url(url)))
    }
}

/// Code metadata loader serving fixed [`Code`] maps by URL.
#[derive(Debug, Default)]
pub struct MockCodeMetaLoader {
    documents: HashMap<String, Code>,
    calls: CallLog,
}

impl MockCodeMetaLoader {
    /// Loader with no registered documents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `code` for `url`.
    #[must_use]
    pub fn with_code(mut self, url: impl Into<String>, code: Code) -> Self {
        self.documents.insert(url.into(), code);
        self
    }

    /// Number of requests made for `url`.
    #[must_use]
    pub fn calls(&self, url: &str) -> usize {
        self.calls.get(url)
    }
}

#[async_trait]
impl CodeMetaLoader for MockCodeMetaLoader {
    async fn load_code_meta(&self, url: &str) -> Result<Code> {
        self.calls.record(url);
        self.documents.get(url).cloned().ok_or_else(|| anyhow!("no code registered for {url}"))
    }
}

/// Transformer that replaces every occurrence of one string with another.
///
/// Produces one transform called `name`. Files that do not contain `from`
/// produce nothing. With `extension` set, the transformed file is renamed to
/// carry that extension.
#[derive(Debug, Clone)]
pub struct ReplaceTransformer {
    /// Transform name
    pub name: String,
    /// Text to replace
    pub from: String,
    /// Replacement
    pub to: String,
    /// Extension of the transformed file, without the dot
    pub extension: Option<String>,
}

impl ReplaceTransformer {
    /// Replace `from` with `to` under transform `name`.
    pub fn new(name: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            to: to.into(),
            extension: None,
        }
    }

    /// Rename transformed files to `extension`.
    #[must_use]
    pub fn renaming_to(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

#[async_trait]
impl TransformSource for ReplaceTransformer {
    async fn transform(&self, source: &str, file_name: &str) -> Result<Option<TransformedSources>> {
        if !source.contains(&self.from) {
            return Ok(None);
        }
        let file_name = self.extension.as_ref().map(|extension| {
            let base = file_name_from_url(file_name);
            match base.rfind('.') {
                Some(index) if index > 0 => format!("{}.{extension}", &base[..index]),
                _ => format!("{base}.{extension}"),
            }
        });

        let mut sources = TransformedSources::new();
        sources.insert(
            self.name.clone(),
            TransformedSource {
                source: source.replace(&self.from, &self.to),
                file_name,
            },
        );
        Ok(Some(sources))
    }
}

/// Parser that rejects every source with `message`.
#[derive(Debug, Clone)]
pub struct FailingParser {
    pub message: String,
}

impl FailingParser {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl SourceParser for FailingParser {
    async fn parse_source(&self, _source: &str, file_name: &str) -> Result<Value> {
        Err(anyhow!("{} in {file_name}", self.message))
    }
}

/// Transformer that rejects every source with `message`.
#[derive(Debug, Clone)]
pub struct FailingTransformer {
    pub message: String,
}

impl FailingTransformer {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl TransformSource for FailingTransformer {
    async fn transform(&self, _source: &str, _file_name: &str) -> Result<Option<TransformedSources>> {
        Err(anyhow!("{}", self.message))
    }
}
