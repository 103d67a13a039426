//! Resolve variants of a code map.
//!
//! # Examples
//!
//! Resolve the first variant:
//! ```bash
//! codevar load code.json
//! ```
//!
//! Resolve every variant, sharing fetches between them:
//! ```bash
//! codevar load code.json --all-variants --format summary
//! ```
//!
//! Produce the initial view a page renders before hydration:
//! ```bash
//! codevar load code.json --fallback --variant TypeScript --initial-file utils.ts
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use colored::Colorize;
use futures::future::try_join_all;
use indexmap::IndexMap;
use url::Url;

use super::default_collaborators;
use crate::cache::FetchCache;
use crate::config::LoaderConfig;
use crate::fallback::{FallbackRequest, load_fallback_code};
use crate::loader::{LoadFileOptions, LoadedFiles, LoadedVariant, Strictness, load_variant};
use crate::models::{Code, VariantEntry};
use crate::sources::meta::parse_code_document;
use crate::utils::url_paths::resolve_against;

#[derive(Args, Debug)]
pub struct LoadCommand {
    /// JSON file holding the code map
    #[arg(value_name = "CODE_JSON")]
    file: PathBuf,

    /// Variant to resolve; defaults to the first one
    #[arg(long)]
    variant: Option<String>,

    /// Resolve every variant
    #[arg(long)]
    all_variants: bool,

    /// Produce the fallback view instead of full variants
    #[arg(long)]
    fallback: bool,

    /// Load extra files in fallback mode even when they are listed
    #[arg(long, requires = "fallback")]
    extra_files: bool,

    /// File to show first in fallback mode
    #[arg(long, value_name = "FILE", requires = "fallback")]
    initial_file: Option<String>,

    /// Parse the fallback source
    #[arg(long, requires = "fallback")]
    highlight: bool,

    /// Recursion ceiling for extra files
    #[arg(long)]
    max_depth: Option<usize>,

    /// Warn instead of failing when a variant has unlisted files
    #[arg(long)]
    lenient: bool,

    /// Keep sources as text
    #[arg(long)]
    no_parse: bool,

    /// Skip transforms
    #[arg(long)]
    no_transforms: bool,

    /// Output format: json or summary
    #[arg(short = 'f', long, default_value = "json")]
    format: String,
}

impl LoadCommand {
    pub async fn execute(self, config: &LoaderConfig) -> Result<()> {
        self.validate_arguments()?;

        let path = tokio::fs::canonicalize(&self.file)
            .await
            .with_context(|| format!("Failed to locate {}", self.file.display()))?;
        let document_url = Url::from_file_path(&path)
            .map_err(|()| anyhow!("Cannot express {} as a file URL", path.display()))?
            .to_string();
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let code = parse_code_document(&text, &document_url)?;

        let initial = match &self.variant {
            Some(name) => name.clone(),
            None => code
                .keys()
                .next()
                .cloned()
                .with_context(|| format!("No variants in {}", path.display()))?,
        };

        let options = self.options(config);
        if self.fallback {
            return self.run_fallback(code, initial, &document_url, &options).await;
        }

        let names: Vec<String> =
            if self.all_variants { code.keys().cloned().collect() } else { vec![initial] };
        tracing::info!("Resolving {} variant(s) from {}", names.len(), path.display());

        let collaborators = default_collaborators();
        let code = &code;
        let options = &options;
        let collaborators = &collaborators;
        let loaded = try_join_all(names.into_iter().map(|name| {
            let document_url = &document_url;
            async move {
                let entry = code.get(&name).cloned();
                let url = match &entry {
                    Some(entry) => entry_url(document_url, entry)?,
                    None => document_url.clone(),
                };
                let variant = load_variant(&url, &name, entry, collaborators, options)
                    .await
                    .with_context(|| format!("Failed to load variant {name}"))?;
                Ok::<_, anyhow::Error>((name, variant))
            }
        }))
        .await?;
        let loaded: IndexMap<String, LoadedVariant> = loaded.into_iter().collect();

        if let Some(record) = &options.loaded_files {
            tracing::info!("Resolved {} file(s)", record.len());
        }

        if self.format == "summary" {
            print_summary(&loaded);
        } else if self.all_variants {
            println!("{}", serde_json::to_string_pretty(&loaded)?);
        } else if let Some(variant) = loaded.values().next() {
            println!("{}", serde_json::to_string_pretty(variant)?);
        }
        Ok(())
    }

    fn validate_arguments(&self) -> Result<()> {
        match self.format.as_str() {
            "json" | "summary" => Ok(()),
            _ => Err(anyhow!("Invalid format '{}'. Valid formats are: json, summary", self.format)),
        }
    }

    /// Flags layered over the configured defaults.
    fn options(&self, config: &LoaderConfig) -> LoadFileOptions {
        let mut options = config.to_options();
        if let Some(max_depth) = self.max_depth {
            options.max_depth = Some(max_depth);
        }
        if self.lenient {
            options.strictness = Strictness::Lenient;
        }
        options.disable_parsing |= self.no_parse;
        options.disable_transforms |= self.no_transforms;
        options.with_fetch_cache(FetchCache::new()).with_loaded_files(LoadedFiles::default())
    }

    async fn run_fallback(
        &self,
        code: Code,
        initial: String,
        document_url: &str,
        options: &LoadFileOptions,
    ) -> Result<()> {
        let entrypoint_url = match code.get(&initial) {
            Some(entry) => entry_url(document_url, entry)?,
            None => document_url.to_string(),
        };
        let request = FallbackRequest {
            initial_filename: self.initial_file.clone(),
            code: Some(code),
            fallback_uses_extra_files: self.extra_files,
            fallback_uses_all_variants: self.all_variants,
            highlight: self.highlight,
            ..FallbackRequest::new(entrypoint_url, initial)
        };

        let fallback = load_fallback_code(request, &default_collaborators(), options)
            .await
            .context("Failed to load fallback code")?;

        if self.format == "summary" {
            println!(
                "{} {}",
                "Initial file:".bold(),
                fallback.initial_filename.as_deref().unwrap_or("-")
            );
            println!("{} {}", "Files:".bold(), fallback.all_file_names.join(", "));
        } else {
            println!("{}", serde_json::to_string_pretty(&fallback)?);
        }
        Ok(())
    }
}

/// Entrypoint URL of a variant slot.
fn entry_url(document_url: &str, entry: &VariantEntry) -> Result<String> {
    match entry {
        VariantEntry::Url(url) => Ok(url.clone()),
        VariantEntry::Variant(variant) => match (&variant.url, &variant.file_name) {
            (Some(url), _) => Ok(url.clone()),
            (None, Some(file_name)) => resolve_against(document_url, file_name)
                .with_context(|| format!("Cannot resolve {file_name} against {document_url}")),
            (None, None) => Ok(document_url.to_string()),
        },
    }
}

fn print_summary(loaded: &IndexMap<String, LoadedVariant>) {
    for (name, variant) in loaded {
        let main = variant.code.file_name.as_deref().unwrap_or("(no main file)");
        println!("{} {}", name.bold().cyan(), format!("({main})").dimmed());

        let extra: Vec<&String> =
            variant.code.extra_files.iter().flat_map(|files| files.keys()).collect();
        if !extra.is_empty() {
            println!("  {} {}", "extra files:".green(), join(&extra));
        }
        let transforms: Vec<&String> =
            variant.code.transforms.iter().flat_map(|transforms| transforms.keys()).collect();
        if !transforms.is_empty() {
            println!("  {} {}", "transforms:".yellow(), join(&transforms));
        }
        if !variant.externals.is_empty() {
            let modules: Vec<&String> = variant.externals.keys().collect();
            println!("  {} {}", "externals:".magenta(), join(&modules));
        }
        println!("  {} {}", "dependencies:".blue(), variant.dependencies.len());
    }
}

fn join(items: &[&String]) -> String {
    items.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}
