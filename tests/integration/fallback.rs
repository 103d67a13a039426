use anyhow::Result;
use std::sync::Arc;

use codevar::core::CodevarError;
use codevar::fallback::{FallbackRequest, load_fallback_code};
use codevar::loader::LoadFileOptions;
use codevar::models::VariantSource;
use codevar::sources::{Collaborators, JsonCodeMetaLoader, PlainTextParser, RoutingSourceLoader};

use crate::common::TestProject;

const CODE_JSON: &str = r#"{
  "TypeScript": {
    "fileName": "index.ts",
    "url": "./index.ts",
    "allFilesListed": true,
    "extraFiles": { "utils.ts": "./utils.ts" }
  },
  "JavaScript": "./index.js"
}"#;

fn collaborators() -> Collaborators {
    let loader = Arc::new(RoutingSourceLoader::new());
    let meta = Arc::new(JsonCodeMetaLoader::new(loader.clone()));
    Collaborators::new()
        .with_source_loader(loader)
        .with_code_meta_loader(meta.clone())
        .with_variant_meta_loader(meta)
        .with_parser(Arc::new(PlainTextParser::new()))
}

#[tokio::test]
async fn test_listed_variant_loads_only_the_initial_file() -> Result<()> {
    let project = TestProject::new()?;
    // index.ts is deliberately absent: the fast path must not touch it
    project.write_file("demo/utils.ts", "export const one = 1;")?;
    project.write_file("demo/code.json", CODE_JSON)?;

    let request = FallbackRequest {
        initial_filename: Some("utils.ts".to_string()),
        ..FallbackRequest::new(project.file_url("demo/code.json"), "TypeScript")
    };
    let fallback = load_fallback_code(request, &collaborators(), &LoadFileOptions::new()).await?;

    assert_eq!(fallback.initial_filename.as_deref(), Some("utils.ts"));
    assert_eq!(fallback.initial_source, Some(VariantSource::from("export const one = 1;")));
    assert_eq!(fallback.all_file_names, vec!["index.ts", "utils.ts"]);
    Ok(())
}

#[tokio::test]
async fn test_all_variants_lists_every_file_name() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("demo/index.ts", "import { one } from './utils';")?;
    project.write_file("demo/utils.ts", "export const one = 1;")?;
    project.write_file("demo/code.json", CODE_JSON)?;

    let request = FallbackRequest {
        fallback_uses_all_variants: true,
        ..FallbackRequest::new(project.file_url("demo/code.json"), "TypeScript")
    };
    let fallback = load_fallback_code(request, &collaborators(), &LoadFileOptions::new()).await?;

    assert_eq!(fallback.initial_filename.as_deref(), Some("index.ts"));
    assert_eq!(
        fallback.initial_source,
        Some(VariantSource::from("import { one } from './utils';"))
    );
    assert_eq!(fallback.all_file_names, vec!["index.ts", "utils.ts", "index.js"]);
    assert!(fallback.code["JavaScript"].as_variant().is_some());
    Ok(())
}

#[tokio::test]
async fn test_unknown_initial_variant() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("demo/code.json", CODE_JSON)?;

    let request = FallbackRequest::new(project.file_url("demo/code.json"), "Python");
    let err = load_fallback_code(request, &collaborators(), &LoadFileOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Initial variant \"Python\" not found in loaded code.");
    assert!(matches!(err, CodevarError::InitialVariantNotFound { .. }));
    Ok(())
}
