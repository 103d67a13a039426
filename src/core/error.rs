//! Error handling for codevar
//!
//! This module provides the error taxonomy of the variant resolution engine and
//! user-friendly error reporting for the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`CodevarError`] - Enumerated error types for every failure of a resolution run
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Inputs**: [`CodevarError::MissingVariant`], [`CodevarError::InitialVariantNotFound`],
//!   [`CodevarError::FileNotFound`]
//! - **Collaborators**: [`CodevarError::MissingSourceLoader`], [`CodevarError::MissingParser`],
//!   [`CodevarError::SourceLoadFailed`], [`CodevarError::ParseFailed`], etc.
//! - **Shapes**: [`CodevarError::InvalidExtraFiles`], [`CodevarError::InvalidExtraDependencies`]
//! - **Graph**: [`CodevarError::CircularDependency`], [`CodevarError::MaxDepthExceeded`],
//!   [`CodevarError::UnexpectedFiles`]
//! - **Transforms**: [`CodevarError::TransformNotFound`], [`CodevarError::TransformFailed`],
//!   [`CodevarError::PatchFailed`]
//!
//! Every variant owns its data as plain strings, so the enum is [`Clone`]. The
//! fetch cache relies on this to hand one failure to every task that awaited
//! the same in-flight fetch.
//!
//! # Examples
//!
//! ```rust,no_run
//! use codevar::core::{CodevarError, user_friendly_error};
//!
//! let error = CodevarError::CircularDependency {
//!     url: "file:///a/util.js".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for variant resolution.
///
/// Display strings are part of the contract: callers and tests match on the
/// exact messages, so they must stay stable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodevarError {
    /// The requested variant is absent from the code map.
    #[error("Variant is missing from code: {name}")]
    MissingVariant {
        /// Name of the missing variant
        name: String,
    },

    /// The main or an extra file has no source and no source loader was supplied.
    #[error("\"loadSource\" function is required when source is not provided")]
    MissingSourceLoader,

    /// A string source needs parsing but no parser was supplied.
    #[error(
        "\"parseSource\" function is required when source is a string and parsing is not disabled"
    )]
    MissingParser,

    /// No code map was supplied and no code metadata loader is available.
    #[error("\"loadCodeMeta\" function is required when code is not provided")]
    MissingCodeMetaLoader,

    /// The source loader rejected a URL.
    #[error("Failed to load source code from {url}: {reason}")]
    SourceLoadFailed {
        /// Absolute URL that failed to load
        url: String,
        /// Underlying loader failure
        reason: String,
    },

    /// The variant metadata loader rejected a variant.
    #[error("Failed to load variant metadata for {variant} from {url}: {reason}")]
    VariantMetaLoadFailed {
        /// Variant name
        variant: String,
        /// URL handed to the metadata loader
        url: String,
        /// Underlying loader failure
        reason: String,
    },

    /// The code metadata loader rejected the entrypoint.
    #[error("Failed to load code metadata from {url}: {reason}")]
    CodeMetaLoadFailed {
        /// Entrypoint URL
        url: String,
        /// Underlying loader failure
        reason: String,
    },

    /// The parser rejected a source.
    #[error("Failed to parse source code ({file_name}): {reason}")]
    ParseFailed {
        /// File whose source failed to parse
        file_name: String,
        /// Underlying parser failure
        reason: String,
    },

    /// An `extraFiles` key or value has an invalid shape.
    #[error("{message}")]
    InvalidExtraFiles {
        /// Fully formatted validation message
        message: String,
    },

    /// An `extraDependencies` entry has an invalid shape.
    #[error("{message}")]
    InvalidExtraDependencies {
        /// Fully formatted validation message
        message: String,
    },

    /// A file references itself directly or through its own ancestors.
    #[error("Circular dependency detected: {url}")]
    CircularDependency {
        /// URL that closed the cycle
        url: String,
    },

    /// Extra file discovery went deeper than the configured ceiling.
    #[error("Maximum recursion depth reached while loading extra files")]
    MaxDepthExceeded,

    /// A variant declared `allFilesListed` but loading discovered more files.
    #[error(
        "Unexpected files discovered via loadSource when allFilesListed=true (variant: {variant}): {files}. \
         Please update the metadata source for this variant to list every extra file."
    )]
    UnexpectedFiles {
        /// Variant that made the promise
        variant: String,
        /// Comma separated list of undeclared file keys
        files: String,
    },

    /// A source transformer rejected a file.
    #[error("Failed to transform source code ({file_name}): {reason}")]
    TransformFailed {
        /// File being transformed
        file_name: String,
        /// Underlying transformer failure
        reason: String,
    },

    /// A named transform is absent from the transform map.
    #[error("Transform \"{key}\" not found in transforms")]
    TransformNotFound {
        /// Requested transform name
        key: String,
    },

    /// Replaying a delta did not produce a usable source.
    #[error("Failed to apply transform \"{key}\": {reason}")]
    PatchFailed {
        /// Transform name
        key: String,
        /// Why the patch could not be applied
        reason: String,
    },

    /// The fallback loader could not find the initial variant.
    #[error("Initial variant \"{name}\" not found in loaded code.")]
    InitialVariantNotFound {
        /// Variant name
        name: String,
    },

    /// The requested initial file is not part of the variant.
    #[error("Failed to get source for file {file} in variant {variant}")]
    FileNotFound {
        /// Requested file name
        file: String,
        /// Variant that was searched
        variant: String,
    },

    /// Configuration file or environment override could not be read.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// Anything that does not fit the categories above.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl CodevarError {
    /// Returns true for the shape-validation family of errors.
    #[must_use]
    pub const fn is_shape_error(&self) -> bool {
        matches!(self, Self::InvalidExtraFiles { .. } | Self::InvalidExtraDependencies { .. })
    }
}

/// Error context wrapper that provides user-friendly error information.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: CodevarError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: CodevarError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Walks the error chain looking for a [`CodevarError`]; errors wrapped with
/// `anyhow` context by the CLI are still recognized. Anything else is reported
/// as [`CodevarError::Other`] carrying the full chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(codevar_error) = cause.downcast_ref::<CodevarError>() {
            return create_error_context(codevar_error);
        }
    }

    if let Some(io_error) = error.chain().find_map(|cause| cause.downcast_ref::<std::io::Error>())
        && io_error.kind() == std::io::ErrorKind::NotFound
    {
        return ErrorContext::new(CodevarError::Other {
            message: format!("{error:#}"),
        })
        .with_suggestion("Check that the file exists and the path is correct");
    }

    ErrorContext::new(CodevarError::Other {
        message: format!("{error:#}"),
    })
}

/// Attach suggestions to a known error.
#[must_use]
pub fn create_error_context(error: &CodevarError) -> ErrorContext {
    let ctx = ErrorContext::new(error.clone());
    match error {
        CodevarError::MissingVariant { .. } | CodevarError::InitialVariantNotFound { .. } => ctx
            .with_suggestion("Check the variant name against the keys of the code map")
            .with_details("Variant names are case sensitive"),
        CodevarError::MissingSourceLoader => ctx
            .with_suggestion("Provide inline sources for every file or configure a source loader"),
        CodevarError::MissingParser => ctx
            .with_suggestion("Configure a parser or disable parsing (--no-parse)"),
        CodevarError::MissingCodeMetaLoader => {
            ctx.with_suggestion("Pass a code map or configure a code metadata loader")
        }
        CodevarError::SourceLoadFailed { url, .. } => ctx
            .with_suggestion("Check that the file exists and is readable")
            .with_details(format!("The loader could not fetch {url}")),
        CodevarError::ParseFailed { .. } => {
            ctx.with_suggestion("Fix the syntax error in the source file or disable parsing")
        }
        CodevarError::InvalidExtraFiles { .. } => ctx
            .with_suggestion("Use relative keys and absolute URL values in extraFiles")
            .with_details("Keys are relative to the file that declares them"),
        CodevarError::InvalidExtraDependencies { .. } => ctx
            .with_suggestion("List only absolute URLs of other files in extraDependencies"),
        CodevarError::CircularDependency { .. } => ctx
            .with_suggestion("Remove the reference that points back to an ancestor file")
            .with_details("Extra files may not reference themselves or any file that led to them"),
        CodevarError::MaxDepthExceeded => ctx
            .with_suggestion("Flatten the extra file chain or raise max_depth (--max-depth)"),
        CodevarError::UnexpectedFiles { .. } => ctx
            .with_suggestion("Add the files to extraFiles or drop allFilesListed from the variant")
            .with_details("Use --lenient to accept the files with a warning"),
        CodevarError::TransformNotFound { .. } => {
            ctx.with_suggestion("List the available transforms on the resolved variant")
        }
        CodevarError::FileNotFound { .. } => {
            ctx.with_suggestion("Use the main file name or a key of extraFiles")
        }
        CodevarError::ConfigError { .. } => {
            ctx.with_suggestion("Check codevar.toml syntax and CODEVAR_* environment variables")
        }
        _ => ctx,
    }
}
