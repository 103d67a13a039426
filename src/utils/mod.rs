//! Utilities shared across the resolution engine
//!
//! # Modules
//!
//! - [`url_paths`] - Absolute/relative classification, URL resolution and
//!   re-keying of extra file references against the entrypoint

pub mod url_paths;

pub use url_paths::{
    extension_of, file_name_from_url, is_absolute, is_filesystem_absolute, make_relative_key,
    resolve_against,
};
