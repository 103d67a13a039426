use anyhow::Result;

use crate::common::TestProject;

const INDEX_TS: &str = "const total: number = 1 + 2;\nconsole.log(total);";
const INDEX_JS: &str = "const total = 1 + 2;\nconsole.log(total);";

/// A variant whose author wrote the JavaScript rendering by hand.
const CODE_JSON: &str = r#"{
  "TypeScript": {
    "fileName": "index.ts",
    "url": "./index.ts",
    "transforms": {
      "js": {
        "fileName": "index.js",
        "source": "const total = 1 + 2;\nconsole.log(total);"
      }
    }
  }
}"#;

fn resolve(project: &TestProject, extra_args: &[&str]) -> Result<()> {
    project.write_file("demo/index.ts", INDEX_TS)?;
    project.write_file("demo/code.json", CODE_JSON)?;

    let mut args = vec!["load", "demo/code.json"];
    args.extend_from_slice(extra_args);
    let output = project.run_codevar(&args)?;
    output.assert_success();

    let json = output.json();
    let transform = &json["code"]["transforms"]["js"];
    assert!(transform.get("delta").is_some(), "author transform should be stored as a delta");
    assert!(transform.get("source").is_none());

    project.write_file("resolved.json", &output.stdout)?;
    Ok(())
}

#[test]
fn test_apply_text_transform() -> Result<()> {
    let project = TestProject::new()?;
    resolve(&project, &["--no-parse"])?;

    let output = project.run_codevar(&["apply", "resolved.json", "--transform", "js"])?;
    output.assert_success();
    assert_eq!(output.stdout.trim_end(), INDEX_JS);
    Ok(())
}

#[test]
fn test_apply_tree_transform() -> Result<()> {
    let project = TestProject::new()?;
    resolve(&project, &[])?;

    let output = project.run_codevar(&["apply", "resolved.json", "-t", "js"])?;
    output.assert_success();
    assert_eq!(output.stdout.trim_end(), INDEX_JS);
    Ok(())
}

#[test]
fn test_apply_whole_variant() -> Result<()> {
    let project = TestProject::new()?;
    resolve(&project, &["--no-parse"])?;

    let output = project.run_codevar(&["apply", "resolved.json", "-t", "js", "--whole"])?;
    output.assert_success();

    let json = output.json();
    assert_eq!(json["fileName"], "index.js");
    assert_eq!(json["source"], INDEX_JS);
    assert!(json.get("transforms").is_none());
    Ok(())
}

#[test]
fn test_apply_unknown_transform() -> Result<()> {
    let project = TestProject::new()?;
    resolve(&project, &["--no-parse"])?;

    project
        .run_codevar(&["apply", "resolved.json", "-t", "py"])?
        .assert_failure()
        .assert_stderr_contains("Transform \"py\" not found in transforms");
    Ok(())
}

#[test]
fn test_apply_unknown_file() -> Result<()> {
    let project = TestProject::new()?;
    resolve(&project, &["--no-parse"])?;

    project
        .run_codevar(&["apply", "resolved.json", "-t", "js", "--file", "missing.ts"])?
        .assert_failure()
        .assert_stderr_contains("Failed to get source for file missing.ts");
    Ok(())
}

#[test]
fn test_no_transforms_flag_drops_transforms() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("demo/index.ts", INDEX_TS)?;
    project.write_file("demo/code.json", CODE_JSON)?;

    let output = project.run_codevar(&["load", "demo/code.json", "--no-transforms"])?;
    output.assert_success();
    assert!(output.json()["code"].get("transforms").is_none());
    Ok(())
}
