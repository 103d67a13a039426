//! codevar - code variant resolution engine
//!
//! Documentation sites show code examples in several renderings: a TypeScript
//! and a JavaScript variant, a CSS Modules and a Tailwind variant. Each variant
//! is a main file plus any number of extra files, some of which are only
//! discovered by loading other files. This crate turns the partial description
//! of such an example into a complete, self-contained data structure.
//!
//! # Architecture Overview
//!
//! Data flows strictly downward:
//!
//! ```text
//! fallback ──► loader ──► utils::url_paths
//!                 │  └──► cache ──► sources (injected I/O)
//!                 └─────► transform
//! ```
//!
//! - [`fallback`] decides whether the initial view of an example can be shown
//!   from metadata alone or needs a full load
//! - [`loader`] resolves one variant: metadata, main source, recursive extra
//!   files, validation, parsing and transforms
//! - [`cache`] deduplicates fetches of the same URL, including fetches that are
//!   still in flight
//! - [`transform`] replays stored transform deltas on a source
//! - [`sources`] defines the collaborator traits and ships filesystem, HTTP
//!   and JSON metadata implementations
//!
//! ## Supporting Modules
//!
//! - [`models`] - The variant data model and its JSON shape
//! - [`core`] - Error type and user-facing error rendering
//! - [`config`] - Loader defaults from `codevar.toml` and the environment
//! - [`cli`] - The `codevar` command-line interface
//! - [`utils`] - URL classification and relative key computation
//!
//! # Keys and URLs
//!
//! Inside a resolved variant every extra file is keyed by a path relative to
//! the variant's `url`, however deep it was found, and every location value is
//! an absolute URL. Loaders must report `extraFiles` as relative key to
//! absolute URL and `extraDependencies` as absolute URLs; anything else is
//! rejected.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use codevar::fallback::{FallbackRequest, load_fallback_code};
//! use codevar::loader::LoadFileOptions;
//! use codevar::sources::{Collaborators, JsonCodeMetaLoader, PlainTextParser, RoutingSourceLoader};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let loader = Arc::new(RoutingSourceLoader::new());
//! let collaborators = Collaborators::new()
//!     .with_source_loader(loader.clone())
//!     .with_code_meta_loader(Arc::new(JsonCodeMetaLoader::new(loader)))
//!     .with_parser(Arc::new(PlainTextParser::new()));
//!
//! let request = FallbackRequest::new("file:///docs/demos/button/code.json", "TypeScript");
//! let fallback = load_fallback_code(request, &collaborators, &LoadFileOptions::new()).await?;
//! println!("{:?}", fallback.all_file_names);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod fallback;
pub mod loader;
pub mod models;
pub mod sources;
pub mod transform;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
