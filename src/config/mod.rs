//! Loader configuration
//!
//! Defaults for resolution runs started from the command line, read from a
//! TOML file and adjusted by environment variables.
//!
//! # Lookup order
//!
//! The first of these that applies is read:
//!
//! 1. The path passed explicitly (`--config`); it must exist
//! 2. The path in `CODEVAR_CONFIG`
//! 3. `./codevar.toml`
//! 4. `codevar/config.toml` under the user configuration directory
//!
//! When none exists the built-in defaults are used.
//!
//! ```toml
//! max_depth = 6
//! strict = false
//! disable_parsing = false
//! disable_transforms = true
//! ```
//!
//! # Environment overrides
//!
//! Applied after the file is read:
//!
//! - `CODEVAR_MAX_DEPTH` - recursion ceiling
//! - `CODEVAR_STRICT` - `1`/`true` or `0`/`false`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_MAX_DEPTH, ENV_CONFIG, ENV_MAX_DEPTH, ENV_STRICT,
};
use crate::core::CodevarError;
use crate::loader::{LoadFileOptions, Strictness};

/// Defaults for resolution runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Recursion ceiling for extra files
    pub max_depth: usize,
    /// Fail on `allFilesListed` mismatches instead of warning
    pub strict: bool,
    /// Keep text sources unparsed
    pub disable_parsing: bool,
    /// Skip source transforms
    pub disable_transforms: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict: true,
            disable_parsing: false,
            disable_transforms: false,
        }
    }
}

impl LoaderConfig {
    /// Path of the user-wide configuration file, if the platform has a
    /// configuration directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Find the configuration file to read, following the lookup order.
    #[must_use]
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(ENV_CONFIG)
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        Self::default_path().filter(|path| path.exists())
    }

    /// Load the configuration and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An explicit path was given and cannot be read
    /// - The file contains invalid TOML or unexpected value types
    /// - An environment override is not a valid value
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) if explicit.is_some() || path.exists() => Self::load_from(&path).await?,
            Some(path) => {
                tracing::debug!("Configuration file {} not found; using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load the configuration from `path` without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `CODEVAR_MAX_DEPTH` and `CODEVAR_STRICT`.
    ///
    /// # Errors
    ///
    /// [`CodevarError::ConfigError`] when a variable holds an invalid value.
    pub fn apply_env_overrides(&mut self) -> Result<(), CodevarError> {
        if let Ok(value) = std::env::var(ENV_MAX_DEPTH) {
            self.max_depth = value.trim().parse().map_err(|_| CodevarError::ConfigError {
                message: format!("{ENV_MAX_DEPTH} must be a non-negative integer, got \"{value}\""),
            })?;
        }
        if let Ok(value) = std::env::var(ENV_STRICT) {
            self.strict = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(CodevarError::ConfigError {
                        message: format!("{ENV_STRICT} must be true or false, got \"{value}\""),
                    });
                }
            };
        }
        Ok(())
    }

    /// Options for a resolution run with these defaults.
    #[must_use]
    pub fn to_options(&self) -> LoadFileOptions {
        LoadFileOptions {
            disable_transforms: self.disable_transforms,
            disable_parsing: self.disable_parsing,
            max_depth: Some(self.max_depth),
            strictness: if self.strict { Strictness::Strict } else { Strictness::Lenient },
            ..LoadFileOptions::default()
        }
    }
}
