//! Code metadata loaded from JSON documents.
//!
//! A metadata document is the JSON form of a [`Code`] map. Relative `url`
//! fields, and variant slots that are bare relative URLs, are resolved against
//! the document's own URL so authors can write `"./index.tsx"`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{CodeMetaLoader, RoutingSourceLoader, SourceLoader, VariantMetaLoader};
use crate::models::{Code, VariantCode, VariantEntry};
use crate::utils::url_paths::{is_absolute, resolve_against};

/// Reads [`Code`] maps and variant definitions from JSON fetched through a
/// [`SourceLoader`].
#[derive(Clone)]
pub struct JsonCodeMetaLoader {
    loader: Arc<dyn SourceLoader>,
}

impl JsonCodeMetaLoader {
    /// Read documents through the given loader.
    #[must_use]
    pub fn new(loader: Arc<dyn SourceLoader>) -> Self {
        Self { loader }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        Ok(self.loader.load_source(url).await?.source)
    }
}

impl Default for JsonCodeMetaLoader {
    fn default() -> Self {
        Self::new(Arc::new(RoutingSourceLoader::new()))
    }
}

impl std::fmt::Debug for JsonCodeMetaLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonCodeMetaLoader").finish_non_exhaustive()
    }
}

/// Parse a code document and resolve its relative URLs against `document_url`.
///
/// # Errors
///
/// Fails on malformed JSON or when a relative URL cannot be resolved.
pub fn parse_code_document(text: &str, document_url: &str) -> Result<Code> {
    let mut code: Code =
        serde_json::from_str(text).with_context(|| format!("Invalid code metadata in {document_url}"))?;

    for (name, entry) in &mut code {
        match entry {
            VariantEntry::Url(url) => {
                if !is_absolute(url) {
                    *url = resolve_against(document_url, url)
                        .with_context(|| format!("Invalid URL for variant {name}"))?;
                }
            }
            VariantEntry::Variant(variant) => resolve_variant_url(variant, document_url)
                .with_context(|| format!("Invalid URL for variant {name}"))?,
        }
    }

    Ok(code)
}

fn resolve_variant_url(variant: &mut VariantCode, document_url: &str) -> Result<()> {
    if let Some(url) = &variant.url
        && !is_absolute(url)
    {
        variant.url = Some(resolve_against(document_url, url)?);
    }
    Ok(())
}

#[async_trait]
impl CodeMetaLoader for JsonCodeMetaLoader {
    async fn load_code_meta(&self, url: &str) -> Result<Code> {
        let text = self.fetch(url).await?;
        parse_code_document(&text, url)
    }
}

#[async_trait]
impl VariantMetaLoader for JsonCodeMetaLoader {
    /// A `.json` URL is read as a variant document; any other URL is treated
    /// as the variant's main file.
    async fn load_variant_meta(&self, variant_name: &str, url: &str) -> Result<VariantCode> {
        if !url.split(['?', '#']).next().unwrap_or(url).ends_with(".json") {
            return Ok(VariantCode::from_url(url));
        }

        let text = self.fetch(url).await?;
        let mut variant: VariantCode = serde_json::from_str(&text)
            .with_context(|| format!("Invalid metadata for variant {variant_name} in {url}"))?;
        resolve_variant_url(&mut variant, url)?;
        Ok(variant)
    }
}
