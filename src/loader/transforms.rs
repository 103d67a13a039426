//! Per-file parsing and transform computation.
//!
//! Each file of a resolved variant goes through [`FileProcessor::process`]
//! once: its text is parsed into a tree unless parsing is disabled, and its
//! transforms are reduced to deltas against that same representation. The
//! transformed text itself is never kept.

use futures::future::try_join_all;
use serde_json::Value;

use super::LoadFileOptions;
use crate::core::CodevarError;
use crate::models::{Transform, TransformedSources, Transforms, VariantSource};
use crate::sources::Collaborators;
use crate::transform::delta::{Delta, diff, lines_to_value};

/// Parses and computes transforms for the files of one run.
pub struct FileProcessor<'a> {
    pub collaborators: &'a Collaborators,
    pub options: &'a LoadFileOptions,
}

impl FileProcessor<'_> {
    /// Produce the final source and transforms of one file.
    ///
    /// Parsed and serialized trees are returned untouched. Text is parsed when
    /// parsing is enabled; either way transforms are computed against the
    /// representation that is returned, so replaying a delta on the returned
    /// source yields the transformed file.
    pub async fn process(
        &self,
        source: VariantSource,
        transforms: Option<Transforms>,
        file_name: &str,
    ) -> Result<(VariantSource, Option<Transforms>), CodevarError> {
        let text = match source {
            VariantSource::Text(text) => text,
            tree => {
                let transforms = if self.options.disable_transforms { None } else { transforms };
                return Ok((tree, transforms));
            }
        };

        let parsed =
            if self.options.disable_parsing { None } else { Some(self.parse(&text, file_name).await?) };

        let transforms = if self.options.disable_transforms {
            None
        } else {
            let base = parsed.clone().unwrap_or_else(|| lines_to_value(&text));
            match transforms {
                Some(existing) => Some(self.rederive(&base, existing, file_name).await?),
                None => self.run_transformers(&text, &base, file_name).await?,
            }
        };

        let source = parsed.map_or(VariantSource::Text(text), VariantSource::Tree);
        Ok((source, transforms.filter(|t| !t.is_empty())))
    }

    async fn parse(&self, text: &str, file_name: &str) -> Result<Value, CodevarError> {
        let parser = self.collaborators.parser.as_ref().ok_or(CodevarError::MissingParser)?;
        parser.parse_source(text, file_name).await.map_err(|e| CodevarError::ParseFailed {
            file_name: file_name.to_string(),
            reason: format!("{e:#}"),
        })
    }

    /// Representation of transformed text comparable with the base.
    async fn comparable(&self, text: &str, file_name: &str) -> Result<Value, CodevarError> {
        if self.options.disable_parsing {
            Ok(lines_to_value(text))
        } else {
            self.parse(text, file_name).await
        }
    }

    async fn delta_to(
        &self,
        base: &Value,
        transformed: &str,
        file_name: &str,
    ) -> Result<Delta, CodevarError> {
        let target = self.comparable(transformed, file_name).await?;
        Ok(diff(base, &target))
    }

    /// Turn author-supplied transform text into deltas.
    ///
    /// Transforms that already carry only a delta are kept as they are.
    async fn rederive(
        &self,
        base: &Value,
        existing: Transforms,
        file_name: &str,
    ) -> Result<Transforms, CodevarError> {
        let mut out = Transforms::new();
        for (name, transform) in existing {
            let Transform {
                delta,
                file_name: target_name,
                source,
            } = transform;

            let resolved = match source {
                Some(text) => {
                    let parse_as = target_name.as_deref().unwrap_or(file_name);
                    Transform {
                        delta: Some(self.delta_to(base, &text, parse_as).await?),
                        file_name: target_name,
                        source: None,
                    }
                }
                None => Transform {
                    delta,
                    file_name: target_name,
                    source: None,
                },
            };
            out.insert(name, resolved);
        }
        Ok(out)
    }

    /// Run every matching transformer and diff what they produce.
    ///
    /// Outputs are merged in transformer order; a later transformer's entry
    /// replaces an earlier one with the same name.
    async fn run_transformers(
        &self,
        text: &str,
        base: &Value,
        file_name: &str,
    ) -> Result<Option<Transforms>, CodevarError> {
        let matching: Vec<_> = self.collaborators.transformers_for(file_name).collect();
        if matching.is_empty() {
            return Ok(None);
        }

        let outputs = try_join_all(matching.iter().map(|entry| async move {
            entry.transformer.transform(text, file_name).await.map_err(|e| {
                CodevarError::TransformFailed {
                    file_name: file_name.to_string(),
                    reason: format!("{e:#}"),
                }
            })
        }))
        .await?;

        let mut merged = TransformedSources::new();
        for (name, transformed) in outputs.into_iter().flatten().flatten() {
            if merged.contains_key(&name) {
                tracing::debug!(
                    target: "codevar::transform",
                    "Transform {name} of {file_name} produced twice; keeping the later one"
                );
            }
            merged.insert(name, transformed);
        }
        if merged.is_empty() {
            return Ok(None);
        }

        let mut transforms = Transforms::new();
        for (name, transformed) in merged {
            let parse_as = transformed.file_name.as_deref().unwrap_or(file_name);
            let delta = self.delta_to(base, &transformed.source, parse_as).await?;
            tracing::debug!(target: "codevar::transform", "Computed transform {name} for {file_name}");
            transforms.insert(
                name,
                Transform {
                    delta: Some(delta),
                    file_name: transformed.file_name,
                    source: None,
                },
            );
        }
        Ok(Some(transforms))
    }
}
