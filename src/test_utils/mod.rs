//! Test utilities for codevar
//!
//! In-memory collaborators and logging setup for tests. The mocks record how
//! often each URL was requested so tests can check that shared files are
//! fetched once per run.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use codevar::models::LoadedSource;
//! use codevar::test_utils::MockSourceLoader;
//!
//! let loader = Arc::new(
//!     MockSourceLoader::new()
//!         .with_source("file:///a.js", LoadedSource::text("a").with_extra_file("b.js", "file:///b.js"))
//!         .with_text("file:///b.js", "b"),
//! );
//! assert_eq!(loader.calls("file:///a.js"), 0);
//! ```

pub mod mocks;

pub use mocks::{
    FailingParser, FailingTransformer, MockCodeMetaLoader, MockSourceLoader, MockVariantMetaLoader,
    ReplaceTransformer,
};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. An explicit `level` wins over
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=codevar=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
