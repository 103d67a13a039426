//! Core types for codevar
//!
//! This module holds the error taxonomy shared by every component of the
//! resolution engine and the helpers that turn those errors into CLI output.
//!
//! - [`CodevarError`] - Enumerated error types covering every failure mode
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format

pub mod error;

pub use error::{CodevarError, ErrorContext, create_error_context, user_friendly_error};

/// Result alias used by the library entry points.
pub type Result<T, E = CodevarError> = std::result::Result<T, E>;
