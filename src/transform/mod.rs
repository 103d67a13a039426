//! Source transform application
//!
//! A transform is stored as a [`Delta`](delta::Delta) against the untransformed
//! source. This module replays those deltas; it never computes them (that
//! happens once, during resolution in [`crate::loader`]).
//!
//! Text sources are replayed as line arrays and rejoined with `\n`. Parsed
//! trees are patched on a copy. Serialized trees are decoded, patched and
//! re-encoded, so the output keeps the representation of the input.
//!
//! # Example
//!
//! ```rust
//! use codevar::models::{Transform, Transforms, VariantSource};
//! use codevar::transform::{apply_transform, delta};
//!
//! let before = "const x = 1;";
//! let after = "const x: number = 1;";
//! let mut transforms = Transforms::new();
//! transforms.insert(
//!     "typescript".to_string(),
//!     Transform {
//!         delta: Some(delta::diff(&delta::lines_to_value(before), &delta::lines_to_value(after))),
//!         file_name: Some("x.ts".to_string()),
//!         source: None,
//!     },
//! );
//!
//! let out = apply_transform(&VariantSource::from(before), &transforms, "typescript").unwrap();
//! assert_eq!(out, VariantSource::from(after));
//! ```

pub mod delta;

use serde_json::Value;

use crate::core::CodevarError;
use crate::models::{ExtraFile, ExtraFileContent, SerializedTree, Transforms, VariantCode, VariantSource};

/// Convert any source representation to the JSON value deltas operate on.
///
/// This is the single normalization point for the three source forms: text
/// becomes an array of lines, trees are used as-is, serialized trees are decoded.
///
/// # Errors
///
/// Fails only when a serialized tree does not contain valid JSON.
pub fn to_diffable(source: &VariantSource) -> Result<Value, serde_json::Error> {
    match source {
        VariantSource::Text(text) => Ok(delta::lines_to_value(text)),
        VariantSource::Tree(tree) => Ok(tree.clone()),
        VariantSource::Serialized(serialized) => serde_json::from_str(&serialized.hast_json),
    }
}

/// Apply the transform named `transform_key` to `source`.
///
/// # Errors
///
/// - [`CodevarError::TransformNotFound`] when the key is absent
/// - [`CodevarError::PatchFailed`] when the delta does not fit the source, the
///   result of a text patch is not a line sequence, or a tree patch yields null
pub fn apply_transform(
    source: &VariantSource,
    transforms: &Transforms,
    transform_key: &str,
) -> Result<VariantSource, CodevarError> {
    let transform = transforms.get(transform_key).ok_or_else(|| CodevarError::TransformNotFound {
        key: transform_key.to_string(),
    })?;

    let failed = |reason: String| CodevarError::PatchFailed {
        key: transform_key.to_string(),
        reason,
    };

    let Some(delta) = &transform.delta else {
        // Author-supplied text that was never resolved into a delta
        return match (&transform.source, source) {
            (Some(text), VariantSource::Text(_)) => Ok(VariantSource::Text(text.clone())),
            _ => Err(failed("transform has no delta".to_string())),
        };
    };

    match source {
        VariantSource::Text(text) => {
            let patched = delta::patch(&delta::lines_to_value(text), delta)
                .map_err(|e| failed(e.to_string()))?;
            let lines = delta::value_to_lines(&patched)
                .ok_or_else(|| failed("patch result is not a line sequence".to_string()))?;
            Ok(VariantSource::Text(lines))
        }
        VariantSource::Tree(tree) => {
            let patched = patch_tree(tree, delta).map_err(failed)?;
            Ok(VariantSource::Tree(patched))
        }
        VariantSource::Serialized(serialized) => {
            let tree: Value = serde_json::from_str(&serialized.hast_json)
                .map_err(|e| failed(format!("invalid serialized tree: {e}")))?;
            let patched = patch_tree(&tree, delta).map_err(failed)?;
            let hast_json = serde_json::to_string(&patched).map_err(|e| failed(e.to_string()))?;
            Ok(VariantSource::Serialized(SerializedTree { hast_json }))
        }
    }
}

fn patch_tree(tree: &Value, delta: &delta::Delta) -> Result<Value, String> {
    let patched = delta::patch(tree, delta).map_err(|e| e.to_string())?;
    if patched.is_null() {
        return Err("patch result is empty".to_string());
    }
    Ok(patched)
}

/// Apply several transforms left to right, feeding each result into the next.
///
/// # Errors
///
/// Returns the first failure of [`apply_transform`].
pub fn apply_transforms<S: AsRef<str>>(
    source: &VariantSource,
    transforms: &Transforms,
    transform_keys: &[S],
) -> Result<VariantSource, CodevarError> {
    transform_keys.iter().try_fold(source.clone(), |current, key| {
        apply_transform(&current, transforms, key.as_ref())
    })
}

/// Materialize one transform across a whole resolved variant.
///
/// The main file and every extra file carrying `transform_key` are replaced by
/// their transformed source and renamed to the transform's `file_name` when it
/// has one. Files without the transform are kept as they are. Transform maps
/// are dropped from the result since their deltas no longer apply.
///
/// # Errors
///
/// Returns the first patch failure.
pub fn apply_transform_to_variant(
    variant: &VariantCode,
    transform_key: &str,
) -> Result<VariantCode, CodevarError> {
    let mut output = variant.clone();
    output.transforms = None;

    if let (Some(source), Some(transforms)) = (&variant.source, &variant.transforms)
        && let Some(transform) = transforms.get(transform_key)
    {
        output.source = Some(apply_transform(source, transforms, transform_key)?);
        if let Some(file_name) = &transform.file_name {
            output.file_name = Some(file_name.clone());
        }
    }

    if let Some(extra_files) = &variant.extra_files {
        let mut renamed = crate::models::ExtraFiles::new();
        for (key, file) in extra_files {
            match (file.source(), file.transforms()) {
                (Some(source), Some(transforms)) if transforms.contains_key(transform_key) => {
                    let transformed = apply_transform(source, transforms, transform_key)?;
                    let new_key = transforms[transform_key]
                        .file_name
                        .as_ref()
                        .map_or_else(|| key.clone(), |name| rename_key(key, name));
                    renamed.insert(new_key, ExtraFile::inline(transformed));
                }
                (Some(source), _) => {
                    renamed.insert(
                        key.clone(),
                        ExtraFile::Inline(ExtraFileContent {
                            source: Some(source.clone()),
                            transforms: None,
                        }),
                    );
                }
                (None, _) => {
                    renamed.insert(key.clone(), file.clone());
                }
            }
        }
        output.extra_files = Some(renamed);
    }

    Ok(output)
}

/// Swap the last segment of a relative key for `file_name`.
fn rename_key(key: &str, file_name: &str) -> String {
    match key.rfind('/') {
        Some(index) => format!("{}{}", &key[..=index], file_name),
        None => file_name.to_string(),
    }
}
