//! Global constants used throughout the codevar codebase.
//!
//! Defaults, file names and environment variable names that are shared by the
//! loader, the configuration layer and the CLI.

/// Default ceiling for extra file recursion when none is configured.
///
/// The entrypoint sits at depth 0 and each hop through a fetched extra file
/// adds one.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Log filter of the CLI when neither `--verbose`, `--quiet` nor `RUST_LOG` is given.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the project-local configuration file.
pub const CONFIG_FILE_NAME: &str = "codevar.toml";

/// Directory under the user config directory that holds the global config.
pub const CONFIG_DIR_NAME: &str = "codevar";

/// Environment variable naming an explicit configuration file.
pub const ENV_CONFIG: &str = "CODEVAR_CONFIG";

/// Environment variable overriding the recursion ceiling.
pub const ENV_MAX_DEPTH: &str = "CODEVAR_MAX_DEPTH";

/// Environment variable selecting strict (`1`/`true`) or lenient handling of
/// `allFilesListed` mismatches.
pub const ENV_STRICT: &str = "CODEVAR_STRICT";

/// User agent sent by the HTTP source loader.
pub const USER_AGENT: &str = concat!("codevar/", env!("CARGO_PKG_VERSION"));

/// Node type of the root of a parsed tree.
pub const TREE_ROOT_TYPE: &str = "root";

/// Key of the serialized tree wrapper.
pub const SERIALIZED_TREE_KEY: &str = "hastJson";
