use std::sync::Arc;

use codevar::loader::{LoadFileOptions, load_variant};
use codevar::models::{LoadedSource, VariantCode, VariantEntry, VariantSource};
use codevar::sources::{Collaborators, PlainTextParser, SourceTransformer};
use codevar::test_utils::{MockSourceLoader, ReplaceTransformer};
use codevar::transform::{apply_transform, apply_transform_to_variant, apply_transforms};

const MAIN_TS: &str = "import { sum } from './sum';\n\nconst total: number = sum([1, 2]);\nconsole.log(total);";
const SUM_TS: &str = "export function sum(values: number[]): number {\n  return values.reduce((a, b) => a + b, 0);\n}";

fn collaborators() -> Collaborators {
    let loader = MockSourceLoader::new()
        .with_source(
            "file:///demo/main.ts",
            LoadedSource::text(MAIN_TS).with_extra_file("sum.ts", "file:///demo/sum.ts"),
        )
        .with_text("file:///demo/sum.ts", SUM_TS);

    Collaborators::new()
        .with_source_loader(Arc::new(loader))
        .with_parser(Arc::new(PlainTextParser::new()))
        .with_source_transformer(SourceTransformer::new(
            ["ts"],
            Arc::new(ReplaceTransformer::new("js", ": number[]", "").renaming_to("js")),
        ))
        .with_source_transformer(SourceTransformer::new(
            ["ts"],
            Arc::new(ReplaceTransformer::new("js", ": number", "").renaming_to("js")),
        ))
        .with_source_transformer(SourceTransformer::new(
            ["ts"],
            Arc::new(ReplaceTransformer::new("verbose", "total", "grandTotal")),
        ))
}

async fn load(options: &LoadFileOptions) -> VariantCode {
    load_variant(
        "file:///demo/main.ts",
        "TypeScript",
        Some(VariantEntry::Url("file:///demo/main.ts".to_string())),
        &collaborators(),
        options,
    )
    .await
    .unwrap()
    .code
}

fn text(source: &VariantSource) -> String {
    match source {
        VariantSource::Text(text) => text.clone(),
        VariantSource::Tree(tree) => PlainTextParser::to_text(tree),
        VariantSource::Serialized(_) => panic!("unexpected serialized tree"),
    }
}

#[tokio::test]
async fn test_line_deltas_reproduce_transformed_text() {
    let code = load(&LoadFileOptions::new().without_parsing()).await;
    let source = code.source.as_ref().unwrap();
    let transforms = code.transforms.as_ref().unwrap();

    // Later transformer wins for the same name
    assert_eq!(
        text(&apply_transform(source, transforms, "js").unwrap()),
        MAIN_TS.replace(": number", "")
    );
    assert_eq!(
        text(&apply_transform(source, transforms, "verbose").unwrap()),
        MAIN_TS.replace("total", "grandTotal")
    );

    let sum = code.extra_files.as_ref().unwrap()["sum.ts"].clone();
    let sum_js = apply_transform(sum.source().unwrap(), sum.transforms().unwrap(), "js").unwrap();
    assert_eq!(text(&sum_js), SUM_TS.replace(": number", ""));
}

#[tokio::test]
async fn test_tree_deltas_reproduce_transformed_tree() {
    let code = load(&LoadFileOptions::new()).await;
    let source = code.source.as_ref().unwrap();
    let transforms = code.transforms.as_ref().unwrap();

    let expected = PlainTextParser::parse(&MAIN_TS.replace(": number", ""));
    assert_eq!(apply_transform(source, transforms, "js").unwrap(), VariantSource::Tree(expected));
}

#[tokio::test]
async fn test_apply_transforms_folds_left_to_right() {
    let code = load(&LoadFileOptions::new().without_parsing()).await;
    let source = code.source.as_ref().unwrap();
    let transforms = code.transforms.as_ref().unwrap();

    let none: &[&str] = &[];
    assert_eq!(&apply_transforms(source, transforms, none).unwrap(), source);
    assert_eq!(
        apply_transforms(source, transforms, &["verbose"]).unwrap(),
        apply_transform(source, transforms, "verbose").unwrap()
    );
    assert_eq!(
        apply_transforms(source, transforms, &["verbose", "missing"]).unwrap_err().to_string(),
        "Transform \"missing\" not found in transforms"
    );
}

#[tokio::test]
async fn test_whole_variant_transform_renames_files() {
    let code = load(&LoadFileOptions::new().without_parsing()).await;

    let js = apply_transform_to_variant(&code, "js").unwrap();
    assert_eq!(js.file_name.as_deref(), Some("main.js"));
    assert_eq!(js.source.as_ref().and_then(VariantSource::as_text), Some(MAIN_TS.replace(": number", "").as_str()));
    assert!(js.transforms.is_none());

    let extra = js.extra_files.as_ref().unwrap();
    assert!(extra.contains_key("sum.js"));
    assert_eq!(
        extra["sum.js"].source().and_then(VariantSource::as_text),
        Some(SUM_TS.replace(": number", "").as_str())
    );
}

#[tokio::test]
async fn test_transformer_returning_nothing_adds_no_transforms() {
    let loader = MockSourceLoader::new().with_text("file:///demo/plain.ts", "console.log(1);");
    let collaborators = Collaborators::new()
        .with_source_loader(Arc::new(loader))
        .with_source_transformer(SourceTransformer::new(
            ["ts"],
            Arc::new(ReplaceTransformer::new("js", ": number", "")),
        ));

    let loaded = load_variant(
        "file:///demo/plain.ts",
        "TypeScript",
        Some(VariantEntry::Url("file:///demo/plain.ts".to_string())),
        &collaborators,
        &LoadFileOptions::new().without_parsing(),
    )
    .await
    .unwrap();

    assert!(loaded.code.transforms.is_none());
}
