//! Command-line interface for codevar.
//!
//! A thin shell over the library: every command builds a [`Collaborators`]
//! set backed by the filesystem and HTTP loaders, turns its flags into
//! [`LoadFileOptions`] on top of the [`LoaderConfig`] defaults, and prints JSON
//! or a short summary.
//!
//! # Available Commands
//!
//! - `load` - Resolve one or all variants of a code map
//! - `apply` - Materialize transforms on a resolved variant
//!
//! # Example
//!
//! ```bash
//! # Resolve the TypeScript variant of a demo
//! codevar load docs/demos/button/code.json --variant TypeScript > resolved.json
//!
//! # Show the JavaScript rendering of its main file
//! codevar apply resolved.json --transform js
//! ```
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//! - `--config` - Path to a custom config file
//!
//! [`Collaborators`]: crate::sources::Collaborators
//! [`LoadFileOptions`]: crate::loader::LoadFileOptions

mod apply;
mod load;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::LoaderConfig;
use crate::constants::DEFAULT_LOG_LEVEL;
use crate::sources::{Collaborators, JsonCodeMetaLoader, PlainTextParser, RoutingSourceLoader};

/// Settings derived from the global flags.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Log filter for the subscriber, `off` when quiet
    pub log_level: String,

    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            config_path: None,
        }
    }
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Parser)]
#[command(
    name = "codevar",
    about = "Resolve, load and transform multi-file code examples",
    version,
    long_about = "codevar resolves the variants of documentation code examples: it follows extra files, \
                  validates their references, parses sources and records transforms as replayable deltas."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to a custom config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve variants of a code map
    Load(load::LoadCommand),

    /// Apply transforms to a resolved variant
    Apply(apply::ApplyCommand),
}

impl Cli {
    /// Execute the parsed command with its own global flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "off"
        } else {
            DEFAULT_LOG_LEVEL
        };

        CliConfig {
            log_level: log_level.to_string(),
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Load(cmd) => {
                let loader_config = LoaderConfig::load(config.config_path.as_deref()).await?;
                cmd.execute(&loader_config).await
            }
            Commands::Apply(cmd) => cmd.execute().await,
        }
    }
}

/// Collaborators backed by the local filesystem and HTTP.
fn default_collaborators() -> Collaborators {
    let loader = Arc::new(RoutingSourceLoader::new());
    let meta = Arc::new(JsonCodeMetaLoader::new(loader.clone()));
    Collaborators::new()
        .with_source_loader(loader)
        .with_code_meta_loader(meta.clone())
        .with_variant_meta_loader(meta)
        .with_parser(Arc::new(PlainTextParser::new()))
}
