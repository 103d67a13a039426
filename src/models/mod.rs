//! Shared data models for code variants
//!
//! These types are the in-memory form of a code example: a [`Code`] map of
//! named variants, each a [`VariantCode`] with a main file, extra files and
//! transforms. They serialize to the camelCase JSON shape consumed by the
//! rendering layer, so every type here round-trips through `serde_json`.
//!
//! Sources are polymorphic. [`VariantSource`] is either raw text, a parsed
//! tree, or a tree serialized into a `{ "hastJson": "..." }` wrapper.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transform::delta::Delta;

/// Map of variant name to variant, in declaration order.
pub type Code = IndexMap<String, VariantEntry>;

/// Map of relative file key to extra file, in declaration order.
pub type ExtraFiles = IndexMap<String, ExtraFile>;

/// Map of transform name to transform.
pub type Transforms = IndexMap<String, Transform>;

/// Map of transform name to transformed text, as produced by a source transformer.
pub type TransformedSources = IndexMap<String, TransformedSource>;

/// Map of module specifier to the imports a file makes from it.
pub type Externals = IndexMap<String, Vec<ExternalImport>>;

/// One variant slot of a [`Code`] map.
///
/// A slot either still points at metadata to be fetched, or already holds the
/// variant definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantEntry {
    /// URL placeholder; the definition comes from the variant metadata loader
    Url(String),
    /// Inline definition
    Variant(Box<VariantCode>),
}

impl VariantEntry {
    /// The inline definition, if this slot holds one.
    #[must_use]
    pub fn as_variant(&self) -> Option<&VariantCode> {
        match self {
            Self::Variant(variant) => Some(variant),
            Self::Url(_) => None,
        }
    }
}

impl From<VariantCode> for VariantEntry {
    fn from(variant: VariantCode) -> Self {
        Self::Variant(Box::new(variant))
    }
}

/// The resolved representation of one code example variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantCode {
    /// Display name of the main file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Absolute URL of the main file; base for every relative key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Main file source; absent means it has to be loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VariantSource>,

    /// Extra files keyed by path relative to `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_files: Option<ExtraFiles>,

    /// Transforms of the main file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Transforms>,

    /// Promise that `extra_files` is already exhaustive
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all_files_listed: bool,
}

impl VariantCode {
    /// Minimal definition for a variant known only by URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self {
            file_name: Some(crate::utils::url_paths::file_name_from_url(url)),
            url: Some(url.to_string()),
            ..Self::default()
        }
    }

    /// Main file name followed by every extra file key.
    #[must_use]
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.file_name.iter().cloned().collect();
        if let Some(extra_files) = &self.extra_files {
            names.extend(extra_files.keys().cloned());
        }
        names
    }
}

/// Source of a file in one of its three representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantSource {
    /// Raw text
    Text(String),
    /// Tree serialized as a JSON string
    Serialized(SerializedTree),
    /// Parsed tree
    Tree(Value),
}

impl VariantSource {
    /// Raw text, if the source has not been parsed.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true for raw text sources.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<&str> for VariantSource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for VariantSource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// `{ "hastJson": "<serialized tree>" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializedTree {
    /// JSON text of the tree
    #[serde(rename = "hastJson")]
    pub hast_json: String,
}

/// An extra file: either a location to fetch or inline content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraFile {
    /// URL of the file
    Url(String),
    /// Inline content
    Inline(ExtraFileContent),
}

impl ExtraFile {
    /// Inline file with the given source and no transforms.
    pub fn inline(source: impl Into<VariantSource>) -> Self {
        Self::Inline(ExtraFileContent {
            source: Some(source.into()),
            transforms: None,
        })
    }

    /// Source of an inline file.
    #[must_use]
    pub fn source(&self) -> Option<&VariantSource> {
        match self {
            Self::Inline(content) => content.source.as_ref(),
            Self::Url(_) => None,
        }
    }

    /// Transforms of an inline file.
    #[must_use]
    pub fn transforms(&self) -> Option<&Transforms> {
        match self {
            Self::Inline(content) => content.transforms.as_ref(),
            Self::Url(_) => None,
        }
    }
}

/// Inline extra file content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraFileContent {
    /// File source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VariantSource>,
    /// Transforms of this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Transforms>,
}

/// A named transformation of a file, stored as a delta against its source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Structural diff from the untransformed to the transformed source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Delta>,
    /// File name the transformed result carries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Author-supplied transformed text; replaced by `delta` during resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Transform {
    /// Returns true when the transform has no visible effect.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.delta.as_ref().is_none_or(Delta::is_unchanged) && self.source.is_none()
    }
}

/// Output entry of a source transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedSource {
    /// Transformed text
    pub source: String,
    /// File name of the transformed file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Result of fetching one file through the source loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedSource {
    /// Raw file text
    pub source: String,
    /// Files this file pulls in: relative key to absolute URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_files: Option<IndexMap<String, String>>,
    /// Additional absolute URLs the file depends on without being displayed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_dependencies: Option<Vec<String>>,
    /// External modules imported by the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub externals: Option<Externals>,
}

impl LoadedSource {
    /// A loaded file with only text.
    pub fn text(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Builder: add a declared extra file.
    #[must_use]
    pub fn with_extra_file(mut self, key: impl Into<String>, url: impl Into<String>) -> Self {
        self.extra_files.get_or_insert_with(IndexMap::new).insert(key.into(), url.into());
        self
    }

    /// Builder: add an extra dependency.
    #[must_use]
    pub fn with_extra_dependency(mut self, url: impl Into<String>) -> Self {
        self.extra_dependencies.get_or_insert_with(Vec::new).push(url.into());
        self
    }

    /// Builder: add an external import.
    #[must_use]
    pub fn with_external(mut self, module: impl Into<String>, import: ExternalImport) -> Self {
        self.externals.get_or_insert_with(IndexMap::new).entry(module.into()).or_default().push(import);
        self
    }
}

/// How a file imports from an external module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// `import x from 'm'`
    Default,
    /// `import { x } from 'm'`
    Named,
    /// `import * as x from 'm'`
    Namespace,
}

/// One import from an external module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalImport {
    /// Local binding name
    pub name: String,
    /// Import form
    #[serde(rename = "type")]
    pub kind: ImportKind,
    /// Type-only import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_type: Option<bool>,
}

impl ExternalImport {
    /// Named value import.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ImportKind::Named,
            is_type: None,
        }
    }

    /// Default import.
    pub fn default_import(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ImportKind::Default,
            is_type: None,
        }
    }
}

/// Merge `from` into `into`, appending imports a module does not list yet.
pub fn merge_externals(into: &mut Externals, from: &Externals) {
    for (module, imports) in from {
        let existing = into.entry(module.clone()).or_default();
        for import in imports {
            if !existing.contains(import) {
                existing.push(import.clone());
            }
        }
    }
}
