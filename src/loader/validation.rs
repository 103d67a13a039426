//! Shape rules for `extraFiles` and `extraDependencies`.
//!
//! Two parties hand the loader file references: the source loader, through
//! [`LoadedSource`], and the author, through a variant's declared
//! `extraFiles`. Both are checked against one rule table. Each [`Rule`] is a
//! predicate over a [`Subject`] plus the error it raises, and subjects are
//! checked against the table in order so the first violated rule wins.

use crate::core::CodevarError;
use crate::models::{ExtraFiles, LoadedSource};
use crate::utils::url_paths::{has_scheme, is_absolute, is_filesystem_absolute};

/// Where an `extraFiles` entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin<'a> {
    /// Returned by the source loader
    LoadSource,
    /// Declared on the named variant
    Variant(&'a str),
}

/// One value under validation.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// An `extraFiles` entry; `value` is the URL when the entry is a location
    ExtraFile {
        /// Provenance of the entry
        origin: Origin<'a>,
        /// Map key
        key: &'a str,
        /// Location value, if the entry is one
        value: Option<&'a str>,
    },
    /// An `extraDependencies` entry of the file at `current_url`
    Dependency {
        /// The dependency
        dependency: &'a str,
        /// URL of the file that declared it
        current_url: &'a str,
    },
}

/// A validation rule.
pub struct Rule {
    /// Short identifier used in logs
    pub name: &'static str,
    /// Returns true when the subject breaks the rule
    pub violated: fn(&Subject<'_>) -> bool,
    /// Error raised on violation
    pub error: fn(&Subject<'_>) -> CodevarError,
}

fn from_loader<'a>(subject: &Subject<'a>) -> Option<(&'a str, Option<&'a str>)> {
    match *subject {
        Subject::ExtraFile { origin: Origin::LoadSource, key, value } => Some((key, value)),
        _ => None,
    }
}

fn from_variant<'a>(subject: &Subject<'a>) -> Option<(&'a str, &'a str)> {
    match *subject {
        Subject::ExtraFile { origin: Origin::Variant(variant), key, .. } => Some((variant, key)),
        _ => None,
    }
}

fn dependency<'a>(subject: &Subject<'a>) -> Option<(&'a str, &'a str)> {
    match *subject {
        Subject::Dependency { dependency, current_url } if !dependency.is_empty() => {
            Some((dependency, current_url))
        }
        _ => None,
    }
}

fn files_error(message: String) -> CodevarError {
    CodevarError::InvalidExtraFiles { message }
}

fn dependencies_error(message: String) -> CodevarError {
    CodevarError::InvalidExtraDependencies { message }
}

/// Every rule, in evaluation order.
pub static RULES: &[Rule] = &[
    Rule {
        name: "loader-key-url",
        violated: |s| from_loader(s).is_some_and(|(key, _)| has_scheme(key)),
        error: |s| {
            let key = from_loader(s).map(|(key, _)| key).unwrap_or_default();
            files_error(format!(
                "Invalid extraFiles from loadSource: key \"{key}\" appears to be an absolute URL. \
                 Keys in extraFiles must be relative paths."
            ))
        },
    },
    Rule {
        name: "loader-key-path",
        violated: |s| from_loader(s).is_some_and(|(key, _)| is_filesystem_absolute(key)),
        error: |s| {
            let key = from_loader(s).map(|(key, _)| key).unwrap_or_default();
            files_error(format!(
                "Invalid extraFiles from loadSource: key \"{key}\" appears to be an absolute path. \
                 Keys in extraFiles must be relative paths."
            ))
        },
    },
    Rule {
        name: "variant-key",
        violated: |s| from_variant(s).is_some_and(|(_, key)| is_absolute(key)),
        error: |s| {
            let (variant, key) = from_variant(s).unwrap_or_default();
            files_error(format!(
                "Invalid extraFiles key in variant {variant}: \"{key}\" appears to be an absolute path. \
                 Keys must be relative paths from the variant's url."
            ))
        },
    },
    Rule {
        name: "loader-value-relative",
        violated: |s| {
            from_loader(s).and_then(|(_, value)| value).is_some_and(|value| !is_absolute(value))
        },
        error: |s| {
            let (key, value) = from_loader(s).unwrap_or_default();
            let value = value.unwrap_or_default();
            files_error(format!(
                "Invalid extraFiles from loadSource: \"{key}\" has relative path \"{value}\". \
                 All extraFiles values must be absolute URLs."
            ))
        },
    },
    Rule {
        name: "dependency-relative",
        violated: |s| dependency(s).is_some_and(|(dep, _)| !is_absolute(dep)),
        error: |s| {
            let (dep, _) = dependency(s).unwrap_or_default();
            dependencies_error(format!(
                "Invalid extraDependencies from loadSource: \"{dep}\" is not an absolute URL. \
                 All extraDependencies must be absolute URLs."
            ))
        },
    },
    Rule {
        name: "dependency-self",
        violated: |s| dependency(s).is_some_and(|(dep, current)| dep == current),
        error: |s| {
            let (dep, _) = dependency(s).unwrap_or_default();
            dependencies_error(format!(
                "Invalid extraDependencies from loadSource: \"{dep}\" is the same as the input URL. \
                 extraDependencies should not include the file being loaded."
            ))
        },
    },
];

/// Check one subject against every rule.
///
/// # Errors
///
/// The error of the first rule the subject violates.
pub fn check(subject: &Subject<'_>) -> Result<(), CodevarError> {
    match RULES.iter().find(|rule| (rule.violated)(subject)) {
        Some(rule) => {
            tracing::debug!(target: "codevar::validation", "Rule {} rejected {subject:?}", rule.name);
            Err((rule.error)(subject))
        }
        None => Ok(()),
    }
}

/// Validate what the source loader returned for `url`.
///
/// # Errors
///
/// The first violation among the declared extra files, then the extra
/// dependencies, in declaration order.
pub fn validate_loaded_source(url: &str, loaded: &LoadedSource) -> Result<(), CodevarError> {
    for (key, value) in loaded.extra_files.iter().flatten() {
        check(&Subject::ExtraFile {
            origin: Origin::LoadSource,
            key,
            value: Some(value.as_str()),
        })?;
    }
    for dependency in loaded.extra_dependencies.iter().flatten() {
        check(&Subject::Dependency {
            dependency,
            current_url: url,
        })?;
    }
    Ok(())
}

/// Validate the keys of a variant's declared `extraFiles`.
///
/// # Errors
///
/// The first key that is absolute in either form.
pub fn validate_variant_extra_files(
    variant_name: &str,
    extra_files: &ExtraFiles,
) -> Result<(), CodevarError> {
    for key in extra_files.keys() {
        check(&Subject::ExtraFile {
            origin: Origin::Variant(variant_name),
            key,
            value: None,
        })?;
    }
    Ok(())
}
