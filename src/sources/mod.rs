//! Collaborators injected into the resolution engine
//!
//! The engine performs no I/O of its own. Everything it needs from the outside
//! world comes through the async traits defined here:
//!
//! - [`CodeMetaLoader`] - fetch a whole [`Code`] map for an entrypoint
//! - [`VariantMetaLoader`] - fetch one variant's definition
//! - [`SourceLoader`] - fetch one file and the files it declares
//! - [`SourceParser`] - parse text into the tree used for highlighting
//! - [`SourceTransformer`] - produce transformed versions of a file
//!
//! [`Collaborators`] bundles them as `Arc<dyn Trait>` so one set can serve many
//! concurrent loads.
//!
//! Ready-made implementations live in the submodules: [`fs`] and [`http`]
//! source loaders, a [`RoutingSourceLoader`] that picks between them by URL
//! scheme, a JSON-file [`JsonCodeMetaLoader`] and the [`PlainTextParser`].

pub mod fs;
pub mod http;
pub mod meta;
pub mod parser;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Code, LoadedSource, TransformedSources, VariantCode};
use crate::utils::url_paths::extension_of;

pub use fs::FsSourceLoader;
pub use http::HttpSourceLoader;
pub use meta::JsonCodeMetaLoader;
pub use parser::PlainTextParser;

/// Fetch the whole variant map for an entrypoint.
#[async_trait]
pub trait CodeMetaLoader: Send + Sync {
    /// Load the [`Code`] map published at `url`.
    async fn load_code_meta(&self, url: &str) -> anyhow::Result<Code>;
}

/// Fetch one variant's definition.
#[async_trait]
pub trait VariantMetaLoader: Send + Sync {
    /// Load the definition of `variant_name` published at `url`.
    async fn load_variant_meta(&self, variant_name: &str, url: &str) -> anyhow::Result<VariantCode>;
}

/// Fetch one file's raw content plus anything it declares.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Load the file at the absolute `url`.
    async fn load_source(&self, url: &str) -> anyhow::Result<LoadedSource>;
}

/// Parse raw text into a tree.
#[async_trait]
pub trait SourceParser: Send + Sync {
    /// Parse `source`; `file_name` selects the grammar.
    async fn parse_source(&self, source: &str, file_name: &str) -> anyhow::Result<Value>;
}

/// Produce transformed versions of a file.
#[async_trait]
pub trait TransformSource: Send + Sync {
    /// Returns `None` when the file has nothing to transform.
    async fn transform(
        &self,
        source: &str,
        file_name: &str,
    ) -> anyhow::Result<Option<TransformedSources>>;
}

/// A transform producer scoped to a set of file extensions.
#[derive(Clone)]
pub struct SourceTransformer {
    /// Extensions this transformer applies to, with or without a leading dot
    pub extensions: Vec<String>,
    /// The producer
    pub transformer: Arc<dyn TransformSource>,
}

impl SourceTransformer {
    /// Create a transformer for the given extensions.
    pub fn new<I, S>(extensions: I, transformer: Arc<dyn TransformSource>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            transformer,
        }
    }

    /// Returns true if this transformer handles `file_name`.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        let Some(extension) = extension_of(file_name) else {
            return false;
        };
        self.extensions.iter().any(|candidate| candidate.trim_start_matches('.') == extension)
    }
}

impl fmt::Debug for SourceTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTransformer").field("extensions", &self.extensions).finish()
    }
}

/// The set of collaborators one resolution run may use.
///
/// Every member is optional; the engine fails with a
/// `Missing*` error only when it actually needs an absent one.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Loads whole code maps
    pub code_meta_loader: Option<Arc<dyn CodeMetaLoader>>,
    /// Loads single variant definitions
    pub variant_meta_loader: Option<Arc<dyn VariantMetaLoader>>,
    /// Loads file sources
    pub source_loader: Option<Arc<dyn SourceLoader>>,
    /// Parses text into trees
    pub parser: Option<Arc<dyn SourceParser>>,
    /// Extension-scoped transform producers, in priority order
    pub source_transformers: Vec<SourceTransformer>,
}

impl Collaborators {
    /// No collaborators at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the code metadata loader.
    #[must_use]
    pub fn with_code_meta_loader(mut self, loader: Arc<dyn CodeMetaLoader>) -> Self {
        self.code_meta_loader = Some(loader);
        self
    }

    /// Set the variant metadata loader.
    #[must_use]
    pub fn with_variant_meta_loader(mut self, loader: Arc<dyn VariantMetaLoader>) -> Self {
        self.variant_meta_loader = Some(loader);
        self
    }

    /// Set the source loader.
    #[must_use]
    pub fn with_source_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.source_loader = Some(loader);
        self
    }

    /// Set the parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Append a source transformer.
    #[must_use]
    pub fn with_source_transformer(mut self, transformer: SourceTransformer) -> Self {
        self.source_transformers.push(transformer);
        self
    }

    /// Transformers whose extensions match `file_name`, in registration order.
    pub fn transformers_for<'a>(
        &'a self,
        file_name: &'a str,
    ) -> impl Iterator<Item = &'a SourceTransformer> + 'a {
        self.source_transformers.iter().filter(move |t| t.matches(file_name))
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("code_meta_loader", &self.code_meta_loader.is_some())
            .field("variant_meta_loader", &self.variant_meta_loader.is_some())
            .field("source_loader", &self.source_loader.is_some())
            .field("parser", &self.parser.is_some())
            .field("source_transformers", &self.source_transformers)
            .finish()
    }
}

/// Source loader that dispatches `file:` URLs to the filesystem and
/// `http(s):` URLs to the network.
#[derive(Debug, Clone, Default)]
pub struct RoutingSourceLoader {
    fs: FsSourceLoader,
    http: HttpSourceLoader,
}

impl RoutingSourceLoader {
    /// Create a loader with default filesystem and HTTP backends.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceLoader for RoutingSourceLoader {
    async fn load_source(&self, url: &str) -> anyhow::Result<LoadedSource> {
        let scheme = url.split_once("://").map(|(scheme, _)| scheme).unwrap_or_default();
        match scheme {
            "file" => self.fs.load_source(url).await,
            "http" | "https" => self.http.load_source(url).await,
            other => anyhow::bail!("Unsupported URL scheme '{other}' for {url}"),
        }
    }
}
