use anyhow::Result;
use predicates::prelude::*;

use crate::common::TestProject;

const INDEX_TS: &str = "import { add } from './utils';\nexport const x: number = add(1, 2);";
const UTILS_TS: &str = "export const add = (a: number, b: number) => a + b;";
const INDEX_JS: &str = "import { add } from './utils';\nexport const x = add(1, 2);";

const CODE_JSON: &str = r#"{
  "TypeScript": {
    "fileName": "index.ts",
    "url": "./index.ts",
    "extraFiles": { "utils.ts": "./utils.ts" }
  },
  "JavaScript": "./index.js"
}"#;

fn demo_project() -> Result<TestProject> {
    let project = TestProject::new()?;
    project.write_file("demo/index.ts", INDEX_TS)?;
    project.write_file("demo/utils.ts", UTILS_TS)?;
    project.write_file("demo/index.js", INDEX_JS)?;
    project.write_file("demo/code.json", CODE_JSON)?;
    Ok(project)
}

#[test]
fn test_load_variant_as_text() -> Result<()> {
    let project = demo_project()?;

    let output =
        project.run_codevar(&["load", "demo/code.json", "--variant", "TypeScript", "--no-parse"])?;
    output.assert_success();

    let json = output.json();
    assert_eq!(json["code"]["fileName"], "index.ts");
    assert_eq!(json["code"]["source"], INDEX_TS);
    assert_eq!(json["code"]["extraFiles"]["utils.ts"]["source"], UTILS_TS);
    assert_eq!(
        json["dependencies"],
        serde_json::json!([project.file_url("demo/index.ts"), project.file_url("demo/utils.ts")])
    );
    Ok(())
}

#[test]
fn test_load_parses_sources_by_default() -> Result<()> {
    let project = demo_project()?;

    let output = project.run_codevar(&["load", "demo/code.json"])?;
    output.assert_success();

    let json = output.json();
    assert_eq!(json["code"]["source"]["type"], "root");
    assert_eq!(json["code"]["extraFiles"]["utils.ts"]["source"]["type"], "root");
    Ok(())
}

#[test]
fn test_load_all_variants_summary() -> Result<()> {
    let project = demo_project()?;

    project
        .run_codevar(&["load", "demo/code.json", "--all-variants", "--format", "summary"])?
        .assert_success()
        .assert_stdout_contains("TypeScript")
        .assert_stdout_contains("JavaScript")
        .assert_stdout_contains("(index.js)")
        .assert_stdout_contains("utils.ts");
    Ok(())
}

#[test]
fn test_load_all_variants_json_is_keyed_by_name() -> Result<()> {
    let project = demo_project()?;

    let output =
        project.run_codevar(&["load", "demo/code.json", "--all-variants", "--no-parse"])?;
    output.assert_success();

    let json = output.json();
    assert_eq!(json["JavaScript"]["code"]["source"], INDEX_JS);
    assert_eq!(json["TypeScript"]["code"]["source"], INDEX_TS);
    Ok(())
}

#[test]
fn test_missing_variant_reports_error() -> Result<()> {
    let project = demo_project()?;

    project
        .run_codevar(&["load", "demo/code.json", "--variant", "Python"])?
        .assert_failure()
        .assert_stderr_contains("Variant is missing from code: Python")
        .assert_stderr_contains("suggestion");
    Ok(())
}

#[test]
fn test_missing_extra_file_reports_error() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("demo/index.ts", INDEX_TS)?;
    project.write_file("demo/code.json", CODE_JSON)?;

    project
        .run_codevar(&["load", "demo/code.json", "--variant", "TypeScript"])?
        .assert_failure()
        .assert_stderr_contains("Failed to load source code from")
        .assert_stderr_contains("utils.ts");
    Ok(())
}

#[test]
fn test_config_file_and_flag_override() -> Result<()> {
    let project = demo_project()?;
    project.write_file("codevar.toml", "max_depth = 0\n")?;

    project
        .run_codevar(&["load", "demo/code.json", "--variant", "TypeScript"])?
        .assert_failure()
        .assert_stderr_contains("Maximum recursion depth reached while loading extra files");

    project
        .run_codevar(&["load", "demo/code.json", "--variant", "TypeScript", "--max-depth", "3"])?
        .assert_success();
    Ok(())
}

#[test]
fn test_invalid_config_file() -> Result<()> {
    let project = demo_project()?;
    project.write_file("broken.toml", "max_depth = [")?;

    project
        .run_codevar(&["load", "demo/code.json", "--config", "broken.toml"])?
        .assert_failure()
        .assert_stderr_contains("Failed to parse config file");
    Ok(())
}

#[test]
fn test_fallback_output() -> Result<()> {
    let project = demo_project()?;

    let output = project.run_codevar(&[
        "load",
        "demo/code.json",
        "--fallback",
        "--variant",
        "TypeScript",
        "--initial-file",
        "utils.ts",
    ])?;
    output.assert_success();

    let json = output.json();
    assert_eq!(json["initialFilename"], "utils.ts");
    assert_eq!(json["initialSource"], UTILS_TS);
    assert_eq!(json["allFileNames"], serde_json::json!(["index.ts", "utils.ts"]));
    Ok(())
}

#[test]
fn test_fallback_flags_require_fallback() {
    let mut cmd = assert_cmd::Command::cargo_bin("codevar").unwrap();
    cmd.args(["load", "code.json", "--highlight"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fallback"));
}

#[test]
fn test_load_help() {
    let mut cmd = assert_cmd::Command::cargo_bin("codevar").unwrap();
    cmd.arg("load")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--all-variants"))
        .stdout(predicate::str::contains("--max-depth"))
        .stdout(predicate::str::contains("--no-transforms"));
}
