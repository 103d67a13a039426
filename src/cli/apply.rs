//! Materialize transforms on a resolved variant.
//!
//! The input is either a bare variant or the output of `codevar load`
//! (`{ code, dependencies, externals }`).
//!
//! ```bash
//! # JavaScript rendering of the main file
//! codevar apply resolved.json --transform js
//!
//! # Chain transforms on an extra file
//! codevar apply resolved.json --file utils.ts -t js -t minified
//!
//! # Rewrite the whole variant
//! codevar apply resolved.json --transform js --whole
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use crate::core::CodevarError;
use crate::models::{VariantCode, VariantSource};
use crate::sources::PlainTextParser;
use crate::transform::{apply_transform_to_variant, apply_transforms};

#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// JSON file holding a resolved variant
    #[arg(value_name = "VARIANT_JSON")]
    input: PathBuf,

    /// Transform to apply; repeat to chain them in order
    #[arg(short = 't', long = "transform", value_name = "NAME", required = true)]
    transforms: Vec<String>,

    /// Extra file to transform instead of the main file
    #[arg(long = "file", value_name = "KEY", conflicts_with = "whole")]
    file_key: Option<String>,

    /// Apply a single transform to every file and print the variant
    #[arg(long)]
    whole: bool,

    /// Print the resulting source as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl ApplyCommand {
    pub async fn execute(self) -> Result<()> {
        let content = tokio::fs::read_to_string(&self.input)
            .await
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let variant = read_variant(&content)
            .with_context(|| format!("Invalid variant in {}", self.input.display()))?;

        if self.whole {
            let [transform] = self.transforms.as_slice() else {
                bail!("--whole takes exactly one --transform");
            };
            let output = apply_transform_to_variant(&variant, transform)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        let result = self.transform_file(&variant)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", render_text(&result)?);
        }
        Ok(())
    }

    fn transform_file(&self, variant: &VariantCode) -> Result<VariantSource> {
        let (name, source, transforms) = match &self.file_key {
            None => (
                variant.file_name.clone().unwrap_or_default(),
                variant.source.as_ref(),
                variant.transforms.as_ref(),
            ),
            Some(key) => {
                let file = variant
                    .extra_files
                    .as_ref()
                    .and_then(|files| files.get(key))
                    .ok_or_else(|| CodevarError::FileNotFound {
                        file: key.clone(),
                        variant: variant.url.clone().unwrap_or_default(),
                    })?;
                (key.clone(), file.source(), file.transforms())
            }
        };

        let source = source
            .with_context(|| format!("{name} has no source; resolve the variant with `codevar load` first"))?;
        let transforms = transforms.cloned().unwrap_or_default();
        tracing::debug!("Applying {} to {name}", self.transforms.join(" -> "));
        Ok(apply_transforms(source, &transforms, &self.transforms)?)
    }
}

/// Accept a bare variant or the `code` field of `codevar load` output.
fn read_variant(content: &str) -> Result<VariantCode> {
    let mut value: Value = serde_json::from_str(content)?;
    if let Some(code) = value.get_mut("code")
        && code.is_object()
    {
        value = code.take();
    }
    Ok(serde_json::from_value(value)?)
}

fn render_text(source: &VariantSource) -> Result<String> {
    Ok(match source {
        VariantSource::Text(text) => text.clone(),
        VariantSource::Tree(tree) => PlainTextParser::to_text(tree),
        VariantSource::Serialized(serialized) => {
            let tree: Value = serde_json::from_str(&serialized.hast_json)
                .context("Serialized tree is not valid JSON")?;
            PlainTextParser::to_text(&tree)
        }
    })
}
