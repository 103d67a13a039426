//! Variant resolution
//!
//! [`load_variant`] turns one entry of a [`Code`](crate::models::Code) map
//! (a URL placeholder or a partial inline definition) into a fully resolved
//! [`VariantCode`]. Every source is present, every extra file reachable from
//! the main file is listed, and every transform is stored as a delta.
//!
//! # Resolution steps
//!
//! 1. A URL placeholder is turned into a definition by the variant metadata
//!    loader, or synthesized from the URL when there is none.
//! 2. The main source is loaded through the fetch cache unless it was given.
//! 3. Extra files declared on the variant and extra files reported by the
//!    source loader are followed level by level, each level concurrently,
//!    fetching every URL once. Anything the source loader reports is checked
//!    against the [`validation`] rules first.
//! 4. The discovered graph is checked for cycles and the depth limit.
//! 5. Sources are parsed and transforms are reduced to deltas.
//!
//! # Keys and URLs
//!
//! Files are identified by absolute URL while loading and by a key relative
//! to the variant's `url` in the result, however deep they were found. A file
//! reached from several places is fetched once and listed once. Two different
//! URLs that end up under the same key are rejected, unless the variant itself
//! declared that key for a file its main source also reports.
//!
//! # Failure
//!
//! Any failure aborts the whole run. The only exception is a variant that
//! declares `allFilesListed` but turns out to have more files: with
//! [`Strictness::Lenient`] that is logged and the files are merged.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use codevar::loader::{LoadFileOptions, load_variant};
//! use codevar::models::VariantEntry;
//! use codevar::sources::{Collaborators, PlainTextParser, RoutingSourceLoader};
//!
//! # async fn example() -> Result<(), codevar::core::CodevarError> {
//! let collaborators = Collaborators::new()
//!     .with_source_loader(Arc::new(RoutingSourceLoader::new()))
//!     .with_parser(Arc::new(PlainTextParser::new()));
//!
//! let loaded = load_variant(
//!     "file:///docs/demos/button/index.tsx",
//!     "TypeScript",
//!     Some(VariantEntry::Url("file:///docs/demos/button/index.tsx".to_string())),
//!     &collaborators,
//!     &LoadFileOptions::new(),
//! )
//! .await?;
//! println!("{} files", loaded.code.file_names().len());
//! # Ok(())
//! # }
//! ```

mod graph;
mod transforms;
pub mod validation;

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashSet;
use futures::future::try_join_all;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::cache::FetchCache;
use crate::constants::DEFAULT_MAX_DEPTH;
use crate::core::CodevarError;
use crate::models::{
    ExtraFile, ExtraFileContent, ExtraFiles, Externals, LoadedSource, Transforms, VariantCode,
    VariantEntry, VariantSource, merge_externals,
};
use crate::sources::Collaborators;
use crate::utils::url_paths::{file_name_from_url, make_relative_key, resolve_against};

use graph::{Discovery, FileGraph};
use transforms::FileProcessor;
use validation::validate_variant_extra_files;

/// Record of every URL resolved by one or more runs.
///
/// Write-only from the loader's side: runs append to it when they succeed and
/// never consult it.
pub type LoadedFiles = Arc<DashSet<String>>;

/// How to treat a variant that declares `allFilesListed` but has more files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strictness {
    /// Fail with [`CodevarError::UnexpectedFiles`]
    #[default]
    Strict,
    /// Log a warning and merge the files
    Lenient,
}

/// Options for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct LoadFileOptions {
    /// Skip source transformers and keep no transforms in the result
    pub disable_transforms: bool,
    /// Keep text sources as text
    pub disable_parsing: bool,
    /// Recursion ceiling for extra files; `None` means [`DEFAULT_MAX_DEPTH`]
    pub max_depth: Option<usize>,
    /// Output record: every dependency URL of a successful run is appended
    /// to it. It is never read, so pre-seeding it affects neither cycle
    /// detection nor fetch deduplication; share a `fetch_cache` for that.
    pub loaded_files: Option<LoadedFiles>,
    /// `allFilesListed` mismatch handling
    pub strictness: Strictness,
    /// Cache to share with other runs; a fresh one is used when absent
    pub fetch_cache: Option<FetchCache>,
}

impl LoadFileOptions {
    /// Default options: parse, transform, strict, default depth.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recursion ceiling.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Keep text sources unparsed.
    #[must_use]
    pub const fn without_parsing(mut self) -> Self {
        self.disable_parsing = true;
        self
    }

    /// Skip transforms.
    #[must_use]
    pub const fn without_transforms(mut self) -> Self {
        self.disable_transforms = true;
        self
    }

    /// Set `allFilesListed` mismatch handling.
    #[must_use]
    pub const fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Share a fetch cache.
    #[must_use]
    pub fn with_fetch_cache(mut self, cache: FetchCache) -> Self {
        self.fetch_cache = Some(cache);
        self
    }

    /// Share a loaded-files record.
    #[must_use]
    pub fn with_loaded_files(mut self, loaded_files: LoadedFiles) -> Self {
        self.loaded_files = Some(loaded_files);
        self
    }

    /// The recursion ceiling in effect.
    #[must_use]
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }
}

/// Result of [`load_variant`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedVariant {
    /// The resolved variant
    pub code: VariantCode,
    /// Every URL the variant depends on, main file first, without repeats
    pub dependencies: Vec<String>,
    /// External modules imported by any loaded file
    pub externals: Externals,
}

/// Turn a variant slot into a definition without loading any source.
///
/// # Errors
///
/// [`CodevarError::VariantMetaLoadFailed`] when the metadata loader fails.
pub async fn load_variant_meta(
    variant_name: &str,
    entry: VariantEntry,
    collaborators: &Collaborators,
) -> Result<VariantCode, CodevarError> {
    let variant_url = match entry {
        VariantEntry::Variant(variant) => return Ok(*variant),
        VariantEntry::Url(url) => url,
    };

    let Some(loader) = &collaborators.variant_meta_loader else {
        return Ok(VariantCode::from_url(&variant_url));
    };

    tracing::debug!(target: "codevar::loader", "Loading metadata of {variant_name} from {variant_url}");
    let mut variant = loader.load_variant_meta(variant_name, &variant_url).await.map_err(|e| {
        CodevarError::VariantMetaLoadFailed {
            variant: variant_name.to_string(),
            url: variant_url.clone(),
            reason: format!("{e:#}"),
        }
    })?;
    if variant.url.is_none() {
        variant.url = Some(variant_url);
    }
    Ok(variant)
}

/// An extra file named directly by the variant or its main file.
struct Planned {
    key: String,
    url: String,
    /// Inline source; fetched from `url` when absent
    inline: Option<VariantSource>,
    transforms: Option<Transforms>,
}

fn plan_declared(main_url: &str, extra_files: Option<&ExtraFiles>) -> Result<Vec<Planned>, CodevarError> {
    let locate = |reference: &str| {
        resolve_against(main_url, reference).map_err(|e| CodevarError::SourceLoadFailed {
            url: reference.to_string(),
            reason: e.to_string(),
        })
    };

    let mut planned = Vec::new();
    for (key, file) in extra_files.into_iter().flatten() {
        planned.push(match file {
            ExtraFile::Url(value) => Planned {
                key: key.clone(),
                url: locate(value)?,
                inline: None,
                transforms: None,
            },
            ExtraFile::Inline(content) => Planned {
                key: key.clone(),
                url: locate(key)?,
                inline: content.source.clone(),
                transforms: content.transforms.clone(),
            },
        });
    }
    Ok(planned)
}

/// A file waiting for parsing and transforms.
struct PendingFile {
    url: String,
    source: VariantSource,
    transforms: Option<Transforms>,
}

/// Flattens the discovered graph into the result's file list and dependency
/// list, depth first in declaration order.
struct Assembly<'a> {
    entry_url: &'a str,
    graph: &'a FileGraph,
    /// URLs named directly by the variant; listed at their own position
    top_level: HashSet<String>,
    /// URLs whose children have been walked
    expanded: HashSet<String>,
    seen: HashSet<String>,
    files: IndexMap<String, PendingFile>,
    dependencies: IndexSet<String>,
    externals: Externals,
}

impl<'a> Assembly<'a> {
    fn new(entry_url: &'a str, graph: &'a FileGraph, planned: &[Planned]) -> Self {
        let mut dependencies = IndexSet::new();
        dependencies.insert(entry_url.to_string());
        Self {
            entry_url,
            graph,
            top_level: planned.iter().map(|p| p.url.clone()).collect(),
            expanded: HashSet::new(),
            seen: HashSet::new(),
            files: IndexMap::new(),
            dependencies,
            externals: Externals::new(),
        }
    }

    /// Record what loading `url` contributed besides the file itself.
    fn absorb(&mut self, url: &str, loaded: &LoadedSource) {
        self.dependencies.insert(url.to_string());
        for dependency in loaded.extra_dependencies.iter().flatten() {
            if !dependency.is_empty() {
                self.dependencies.insert(dependency.clone());
            }
        }
        if let Some(externals) = &loaded.externals {
            merge_externals(&mut self.externals, externals);
        }
    }

    /// List `file` under `key`. A URL is listed once; two different URLs
    /// under one key are rejected.
    fn add_file(&mut self, key: String, file: PendingFile) -> Result<(), CodevarError> {
        if !self.seen.insert(file.url.clone()) {
            return Ok(());
        }
        if let Some(existing) = self.files.get(&key) {
            return Err(CodevarError::InvalidExtraFiles {
                message: format!(
                    "Invalid extraFiles: key \"{key}\" refers to both {} and {}. \
                     Each extra file of a variant needs its own key.",
                    existing.url, file.url
                ),
            });
        }
        self.files.insert(key, file);
        Ok(())
    }

    /// Add the fetched file at `url` and, depth first, everything below it.
    fn add_node(
        &mut self,
        key: Option<String>,
        transforms: Option<Transforms>,
        url: &str,
    ) -> Result<(), CodevarError> {
        let graph = self.graph;
        let Some(node) = graph.get(url) else {
            return Ok(());
        };
        self.absorb(url, &node.loaded);

        let key = match key {
            Some(key) => Some(key),
            None if self.top_level.contains(url) => None,
            None => Some(make_relative_key(self.entry_url, url).ok_or_else(|| {
                CodevarError::InvalidExtraFiles {
                    message: format!(
                        "Invalid extraFiles from loadSource: \"{url}\" cannot be expressed relative to {}. \
                         Nested extra files must share the origin of the variant.",
                        self.entry_url
                    ),
                }
            })?),
        };
        if let Some(key) = key {
            let file = PendingFile {
                url: url.to_string(),
                source: VariantSource::Text(node.loaded.source.clone()),
                transforms,
            };
            self.add_file(key, file)?;
        }

        // Everything below a URL is the same however it was reached
        if self.expanded.insert(url.to_string()) {
            for child in &node.children {
                self.add_node(None, None, child)?;
            }
        }
        Ok(())
    }
}

/// Resolve one variant completely.
///
/// `url` is the entrypoint; it is the variant's URL unless the definition
/// carries its own. `entry` is the variant's slot in the code map, `None` when
/// the map has no such variant.
///
/// # Errors
///
/// See [`CodevarError`]; every failure of any file aborts the run.
pub async fn load_variant(
    url: &str,
    variant_name: &str,
    entry: Option<VariantEntry>,
    collaborators: &Collaborators,
    options: &LoadFileOptions,
) -> Result<LoadedVariant, CodevarError> {
    let entry = entry.ok_or_else(|| CodevarError::MissingVariant {
        name: variant_name.to_string(),
    })?;
    let variant = load_variant_meta(variant_name, entry, collaborators).await?;

    let main_url = match &variant.url {
        Some(own) => resolve_against(url, own).map_err(|e| CodevarError::SourceLoadFailed {
            url: own.clone(),
            reason: e.to_string(),
        })?,
        None => url.to_string(),
    };
    tracing::debug!(target: "codevar::loader", "Loading variant {variant_name} from {main_url}");

    if let Some(extra_files) = &variant.extra_files {
        validate_variant_extra_files(variant_name, extra_files)?;
    }

    let cache = options.fetch_cache.clone().unwrap_or_default();
    let mut planned = plan_declared(&main_url, variant.extra_files.as_ref())?;
    let declared: HashSet<String> = planned.iter().map(|p| p.url.clone()).collect();

    let discovery = Discovery {
        collaborators,
        cache: &cache,
        max_depth: options.effective_max_depth(),
        strictness: options.strictness,
        variant_name,
        entry_url: &main_url,
        listed: variant.all_files_listed.then_some(&declared),
    };

    // A variant without a main file name keeps all its content in extra files
    let skip_main = variant.source.is_none()
        && variant.file_name.is_none()
        && variant.extra_files.as_ref().is_some_and(|files| !files.is_empty());
    let main_loaded = if variant.source.is_none() && !skip_main {
        Some(discovery.fetch(&main_url).await?)
    } else {
        None
    };

    if let Some(loaded) = &main_loaded {
        let declared_keys: HashSet<&String> = variant.extra_files.iter().flat_map(|files| files.keys()).collect();
        for (key, child_url) in discovery.follow(loaded)? {
            if declared.contains(&child_url) {
                continue;
            }
            // The variant's own entry for a key overrides the loader's
            if declared_keys.contains(&key) {
                tracing::debug!(
                    target: "codevar::loader",
                    "Variant {variant_name} declares {key}; not loading {child_url}"
                );
            } else {
                planned.push(Planned {
                    key,
                    url: child_url,
                    inline: None,
                    transforms: None,
                });
            }
        }
    }

    let roots: Vec<String> =
        planned.iter().filter(|item| item.inline.is_none()).map(|item| item.url.clone()).collect();
    let graph = discovery.discover(&roots).await?;
    graph.check(&main_url, &roots, discovery.max_depth)?;
    tracing::debug!(target: "codevar::loader", "Discovered {} extra file(s) for {variant_name}", graph.len());

    let mut assembly = Assembly::new(&main_url, &graph, &planned);
    if let Some(loaded) = &main_loaded {
        assembly.absorb(&main_url, loaded);
    }
    for item in planned {
        match item.inline {
            None => assembly.add_node(Some(item.key), item.transforms, &item.url)?,
            Some(source) => {
                let file = PendingFile {
                    url: item.url,
                    source,
                    transforms: item.transforms,
                };
                assembly.add_file(item.key, file)?;
            }
        }
    }

    let Assembly {
        files,
        dependencies,
        externals,
        ..
    } = assembly;

    let processor = &FileProcessor {
        collaborators,
        options,
    };
    let main_source =
        variant.source.clone().or_else(|| main_loaded.map(|loaded| VariantSource::Text(loaded.source.clone())));
    let main_file_name = variant
        .file_name
        .clone()
        .or_else(|| main_source.as_ref().map(|_| file_name_from_url(&main_url)));

    let main_name = main_file_name.clone().unwrap_or_default();
    let main_transforms = variant.transforms.clone();
    let main = async move {
        match main_source {
            Some(source) => {
                let (source, transforms) = processor.process(source, main_transforms, &main_name).await?;
                Ok::<_, CodevarError>((Some(source), transforms))
            }
            None if options.disable_transforms => Ok((None, None)),
            None => Ok((None, main_transforms)),
        }
    };
    let extras = try_join_all(files.into_iter().map(|(key, file)| async move {
        let name = file_name_from_url(&key);
        let (source, transforms) = processor.process(file.source, file.transforms, &name).await?;
        let file = ExtraFile::Inline(ExtraFileContent {
            source: Some(source),
            transforms,
        });
        Ok::<_, CodevarError>((key, file))
    }));
    let ((source, transforms), extra_files) = futures::try_join!(main, extras)?;

    let extra_files: ExtraFiles = extra_files.into_iter().collect();
    let code = VariantCode {
        file_name: main_file_name,
        url: Some(main_url.clone()),
        source,
        extra_files: (variant.extra_files.is_some() || !extra_files.is_empty()).then_some(extra_files),
        transforms,
        all_files_listed: variant.all_files_listed,
    };
    let dependencies: Vec<String> = dependencies.into_iter().collect();

    if let Some(record) = &options.loaded_files {
        for dependency in &dependencies {
            record.insert(dependency.clone());
        }
    }

    tracing::debug!(
        target: "codevar::loader",
        "Loaded variant {variant_name}: {} extra files, {} dependencies",
        code.extra_files.as_ref().map_or(0, IndexMap::len),
        dependencies.len()
    );

    Ok(LoadedVariant {
        code,
        dependencies,
        externals,
    })
}
