use std::sync::Arc;

use codevar::cache::FetchCache;
use codevar::core::CodevarError;
use codevar::loader::validation::RULES;
use codevar::loader::{LoadFileOptions, LoadedFiles, load_variant};
use codevar::models::{ExtraFile, ExtraFiles, LoadedSource, VariantCode, VariantEntry};
use codevar::sources::Collaborators;
use codevar::test_utils::MockSourceLoader;

const ENTRY: &str = "file:///demo/index.js";

/// Load `ENTRY` whose loader reports `main`, returning the error and the
/// loaded-files record.
async fn load_with_main(main: LoadedSource) -> (CodevarError, LoadedFiles) {
    let loader = MockSourceLoader::new().with_source(ENTRY, main).with_text("file:///demo/a.js", "a");
    let collaborators = Collaborators::new().with_source_loader(Arc::new(loader));
    let record = LoadedFiles::default();

    let err = load_variant(
        ENTRY,
        "Default",
        Some(VariantEntry::Url(ENTRY.to_string())),
        &collaborators,
        &LoadFileOptions::new().without_parsing().with_loaded_files(record.clone()),
    )
    .await
    .unwrap_err();
    (err, record)
}

#[test]
fn test_rule_table_is_complete() {
    let names: Vec<_> = RULES.iter().map(|rule| rule.name).collect();
    assert_eq!(
        names,
        vec![
            "loader-key-url",
            "loader-key-path",
            "variant-key",
            "loader-value-relative",
            "dependency-relative",
            "dependency-self",
        ]
    );
}

#[tokio::test]
async fn test_loader_key_absolute_url() {
    let (err, record) =
        load_with_main(LoadedSource::text("").with_extra_file("https://cdn.example.com/a.js", "file:///demo/a.js"))
            .await;
    assert_eq!(
        err.to_string(),
        "Invalid extraFiles from loadSource: key \"https://cdn.example.com/a.js\" appears to be an absolute URL. \
         Keys in extraFiles must be relative paths."
    );
    assert!(record.is_empty());
}

#[tokio::test]
async fn test_loader_key_absolute_path() {
    let (err, record) =
        load_with_main(LoadedSource::text("").with_extra_file("/demo/a.js", "file:///demo/a.js")).await;
    assert_eq!(
        err.to_string(),
        "Invalid extraFiles from loadSource: key \"/demo/a.js\" appears to be an absolute path. \
         Keys in extraFiles must be relative paths."
    );
    assert!(record.is_empty());
}

#[tokio::test]
async fn test_loader_value_relative() {
    let (err, record) = load_with_main(LoadedSource::text("").with_extra_file("a.js", "./a.js")).await;
    assert_eq!(
        err.to_string(),
        "Invalid extraFiles from loadSource: \"a.js\" has relative path \"./a.js\". \
         All extraFiles values must be absolute URLs."
    );
    assert!(matches!(err, CodevarError::InvalidExtraFiles { .. }));
    assert!(record.is_empty());
}

#[tokio::test]
async fn test_dependency_relative() {
    let (err, record) = load_with_main(LoadedSource::text("").with_extra_dependency("../package.json")).await;
    assert_eq!(
        err.to_string(),
        "Invalid extraDependencies from loadSource: \"../package.json\" is not an absolute URL. \
         All extraDependencies must be absolute URLs."
    );
    assert!(matches!(err, CodevarError::InvalidExtraDependencies { .. }));
    assert!(record.is_empty());
}

#[tokio::test]
async fn test_dependency_self() {
    let (err, record) = load_with_main(LoadedSource::text("").with_extra_dependency(ENTRY)).await;
    assert_eq!(
        err.to_string(),
        "Invalid extraDependencies from loadSource: \"file:///demo/index.js\" is the same as the input URL. \
         extraDependencies should not include the file being loaded."
    );
    assert!(record.is_empty());
}

#[tokio::test]
async fn test_variant_key_absolute() {
    let loader = Arc::new(MockSourceLoader::new().with_text(ENTRY, "main"));
    let collaborators = Collaborators::new().with_source_loader(loader.clone());
    let cache = FetchCache::new();

    let mut extra = ExtraFiles::new();
    extra.insert("file:///demo/a.js".to_string(), ExtraFile::inline("a"));
    let variant = VariantCode {
        file_name: Some("index.js".to_string()),
        url: Some(ENTRY.to_string()),
        extra_files: Some(extra),
        ..VariantCode::default()
    };

    let err = load_variant(
        ENTRY,
        "Default",
        Some(variant.into()),
        &collaborators,
        &LoadFileOptions::new().without_parsing().with_fetch_cache(cache.clone()),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Invalid extraFiles key in variant Default: \"file:///demo/a.js\" appears to be an absolute path. \
         Keys must be relative paths from the variant's url."
    );
    // Rejected before anything is fetched
    assert_eq!(loader.total_calls(), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_dependency_equal_to_other_file_is_kept() {
    let loader = MockSourceLoader::new()
        .with_source(
            ENTRY,
            LoadedSource::text("")
                .with_extra_file("a.js", "file:///demo/a.js")
                .with_extra_dependency("file:///demo/a.js"),
        )
        .with_text("file:///demo/a.js", "a");
    let collaborators = Collaborators::new().with_source_loader(Arc::new(loader));

    let loaded = load_variant(
        ENTRY,
        "Default",
        Some(VariantEntry::Url(ENTRY.to_string())),
        &collaborators,
        &LoadFileOptions::new().without_parsing(),
    )
    .await
    .unwrap();

    assert_eq!(loaded.dependencies, vec![ENTRY, "file:///demo/a.js"]);
}
