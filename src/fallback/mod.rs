//! Fast first-paint loading
//!
//! [`load_fallback_code`] produces just enough of a code example to render it
//! before the full variant set is resolved: the source of one file of one
//! variant plus the names of the files around it.
//!
//! When the initial variant's metadata already lists every file and the caller
//! needs neither extra file contents nor other variants, only the initial file
//! is fetched. Otherwise the variant goes through [`load_variant`] with
//! transforms disabled.
//!
//! Every load performed here shares one [`FetchCache`] and one loaded-files
//! record, so the later full resolution of the page can reuse them.

use std::sync::Arc;

use futures::future::try_join_all;
use indexmap::IndexSet;
use serde::Serialize;

use crate::cache::FetchCache;
use crate::core::CodevarError;
use crate::loader::{LoadFileOptions, LoadedFiles, load_variant, load_variant_meta};
use crate::models::{Code, ExtraFile, ExtraFiles, VariantCode, VariantEntry, VariantSource};
use crate::sources::Collaborators;
use crate::utils::url_paths::resolve_against;

/// What to load for the first paint.
#[derive(Debug, Clone, Default)]
pub struct FallbackRequest {
    /// URL the code map belongs to
    pub entrypoint_url: String,
    /// Variant shown first
    pub initial_variant: String,
    /// File shown first; the main file when absent
    pub initial_filename: Option<String>,
    /// Code map, when the caller already has it
    pub code: Option<Code>,
    /// The first paint shows extra file contents
    pub fallback_uses_extra_files: bool,
    /// The first paint lists files of every variant
    pub fallback_uses_all_variants: bool,
    /// Parse the initial source for highlighting
    pub highlight: bool,
}

impl FallbackRequest {
    /// Request the main file of `initial_variant`.
    pub fn new(entrypoint_url: impl Into<String>, initial_variant: impl Into<String>) -> Self {
        Self {
            entrypoint_url: entrypoint_url.into(),
            initial_variant: initial_variant.into(),
            ..Self::default()
        }
    }
}

/// Result of [`load_fallback_code`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackCode {
    /// The code map with every variant touched here replaced by its resolved form
    pub code: Code,
    /// Source of the initial file
    pub initial_source: Option<VariantSource>,
    /// Name of the initial file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_filename: Option<String>,
    /// Extra files of the initial variant as far as they are known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_extra_files: Option<ExtraFiles>,
    /// Every file name of the initial variant, then of the other variants when requested
    pub all_file_names: Vec<String>,
}

/// Where the initial file's source comes from.
enum InitialFile {
    Inline(String, VariantSource),
    Remote(String, String),
    None,
}

fn locate_initial(
    variant: &VariantCode,
    variant_name: &str,
    requested: Option<&str>,
) -> Result<InitialFile, CodevarError> {
    let base = variant.url.as_deref().unwrap_or_default();
    let resolve = |reference: &str| {
        resolve_against(base, reference).map_err(|e| CodevarError::SourceLoadFailed {
            url: reference.to_string(),
            reason: e.to_string(),
        })
    };

    let wants_main = match requested {
        None => true,
        Some(name) => variant.file_name.as_deref() == Some(name),
    };

    if wants_main && variant.file_name.is_some() {
        let name = variant.file_name.clone().unwrap_or_default();
        return match (&variant.source, &variant.url) {
            (Some(source), _) => Ok(InitialFile::Inline(name, source.clone())),
            (None, Some(url)) => Ok(InitialFile::Remote(name, url.clone())),
            (None, None) => Err(CodevarError::FileNotFound {
                file: name,
                variant: variant_name.to_string(),
            }),
        };
    }

    let extra_files = variant.extra_files.as_ref();
    let found = match requested {
        Some(name) => extra_files.and_then(|files| files.get_key_value(name)),
        // No main file: start with the first extra file
        None => extra_files.and_then(|files| files.first()),
    };

    match found {
        Some((key, ExtraFile::Url(url))) => Ok(InitialFile::Remote(key.clone(), resolve(url)?)),
        Some((key, file)) => match file.source() {
            Some(source) => Ok(InitialFile::Inline(key.clone(), source.clone())),
            None => Ok(InitialFile::Remote(key.clone(), resolve(key)?)),
        },
        None if requested.is_none() => Ok(InitialFile::None),
        None => Err(CodevarError::FileNotFound {
            file: requested.unwrap_or_default().to_string(),
            variant: variant_name.to_string(),
        }),
    }
}

/// Load the initial view of a code example.
///
/// # Errors
///
/// - [`CodevarError::MissingCodeMetaLoader`] / [`CodevarError::CodeMetaLoadFailed`]
///   when no code map was given and it cannot be loaded
/// - [`CodevarError::InitialVariantNotFound`] when the map lacks the variant
/// - [`CodevarError::FileNotFound`] when the requested file is not part of it
/// - anything [`load_variant`] returns on the full path
pub async fn load_fallback_code(
    request: FallbackRequest,
    collaborators: &Collaborators,
    options: &LoadFileOptions,
) -> Result<FallbackCode, CodevarError> {
    let FallbackRequest {
        entrypoint_url,
        initial_variant,
        initial_filename,
        code,
        fallback_uses_extra_files,
        fallback_uses_all_variants,
        highlight,
    } = request;

    let mut code = match code {
        Some(code) => code,
        None => {
            let loader =
                collaborators.code_meta_loader.as_ref().ok_or(CodevarError::MissingCodeMetaLoader)?;
            tracing::debug!(target: "codevar::fallback", "Loading code metadata from {entrypoint_url}");
            loader.load_code_meta(&entrypoint_url).await.map_err(|e| CodevarError::CodeMetaLoadFailed {
                url: entrypoint_url.clone(),
                reason: format!("{e:#}"),
            })?
        }
    };

    let entry = code.get(&initial_variant).cloned().ok_or_else(|| {
        CodevarError::InitialVariantNotFound {
            name: initial_variant.clone(),
        }
    })?;

    let run_options = LoadFileOptions {
        disable_transforms: true,
        disable_parsing: !highlight,
        fetch_cache: Some(options.fetch_cache.clone().unwrap_or_default()),
        loaded_files: Some(options.loaded_files.clone().unwrap_or_else(LoadedFiles::default)),
        ..options.clone()
    };

    let variant = load_variant_meta(&initial_variant, entry, collaborators).await?;

    if variant.all_files_listed && !fallback_uses_extra_files && !fallback_uses_all_variants {
        tracing::debug!(target: "codevar::fallback", "Variant {initial_variant} lists its files; skipping full load");
        let (initial_filename, initial_source) = load_initial(
            &variant,
            &initial_variant,
            initial_filename.as_deref(),
            collaborators,
            &run_options,
        )
        .await?;

        let all_file_names = variant.file_names();
        let initial_extra_files = variant.extra_files.clone();
        code.insert(initial_variant, variant.into());
        return Ok(FallbackCode {
            code,
            initial_source,
            initial_filename,
            initial_extra_files,
            all_file_names,
        });
    }

    let loaded = load_variant(
        &entrypoint_url,
        &initial_variant,
        Some(variant.into()),
        collaborators,
        &run_options,
    )
    .await?;

    let (initial_filename, initial_source) =
        match locate_initial(&loaded.code, &initial_variant, initial_filename.as_deref())? {
            InitialFile::Inline(name, source) => (Some(name), Some(source)),
            InitialFile::Remote(name, _) => {
                return Err(CodevarError::FileNotFound {
                    file: name,
                    variant: initial_variant,
                });
            }
            InitialFile::None => (None, None),
        };

    let mut all_file_names: IndexSet<String> = loaded.code.file_names().into_iter().collect();
    let initial_extra_files = loaded.code.extra_files.clone();
    code.insert(initial_variant.clone(), loaded.code.into());

    if fallback_uses_all_variants {
        let others: Vec<(String, VariantEntry)> = code
            .iter()
            .filter(|(name, _)| **name != initial_variant)
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();

        let resolved = try_join_all(others.into_iter().map(|(name, entry)| async move {
            let variant = load_variant_meta(&name, entry, collaborators).await?;
            Ok::<_, CodevarError>((name, variant))
        }))
        .await?;

        for (name, variant) in resolved {
            all_file_names.extend(variant.file_names());
            code.insert(name, variant.into());
        }
    }

    Ok(FallbackCode {
        code,
        initial_source,
        initial_filename,
        initial_extra_files,
        all_file_names: all_file_names.into_iter().collect(),
    })
}

/// Fetch and optionally parse only the initial file of `variant`.
async fn load_initial(
    variant: &VariantCode,
    variant_name: &str,
    requested: Option<&str>,
    collaborators: &Collaborators,
    options: &LoadFileOptions,
) -> Result<(Option<String>, Option<VariantSource>), CodevarError> {
    let (name, source) = match locate_initial(variant, variant_name, requested)? {
        InitialFile::Inline(name, source) => (name, source),
        InitialFile::Remote(name, url) => {
            let loader: &Arc<_> =
                collaborators.source_loader.as_ref().ok_or(CodevarError::MissingSourceLoader)?;
            let cache = options.fetch_cache.clone().unwrap_or_else(FetchCache::new);
            let loaded = cache.get(&url, loader).await?;
            if let Some(record) = &options.loaded_files {
                record.insert(url);
            }
            (name, VariantSource::Text(loaded.source.clone()))
        }
        InitialFile::None => return Ok((None, None)),
    };

    let source = match source {
        VariantSource::Text(text) if !options.disable_parsing => {
            let parser = collaborators.parser.as_ref().ok_or(CodevarError::MissingParser)?;
            let tree = parser.parse_source(&text, &name).await.map_err(|e| CodevarError::ParseFailed {
                file_name: name.clone(),
                reason: format!("{e:#}"),
            })?;
            VariantSource::Tree(tree)
        }
        other => other,
    };

    Ok((Some(name), Some(source)))
}
