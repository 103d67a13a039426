//! Integration test suite for codevar
//!
//! End-to-end tests that resolve code examples stored on disk, either through
//! the library with the real filesystem loaders or by running the `codevar`
//! binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli_apply**: `codevar apply` on variants produced by `codevar load`
//! - **cli_load**: `codevar load` output, formats, configuration and errors
//! - **fallback**: Fallback view over code maps read from disk
//! - **filesystem**: Variant resolution with the filesystem source loader

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli_apply;
mod cli_load;
mod fallback;
