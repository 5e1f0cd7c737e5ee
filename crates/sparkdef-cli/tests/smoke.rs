//! Smoke tests for the `sparkdef` binary.
//!
//! None of these need a JDK: compiler launches are pointed at a missing
//! binary through the config file.

use std::process::Command;

fn sparkdef() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sparkdef"))
}

fn config_without_jdk(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let scratch = dir.path().join("scratch");
    std::fs::write(
        &path,
        format!(
            "[compiler]\njavac_bin = \"/nonexistent/bin/javac\"\n\n[scratch]\nroot = {:?}\n",
            scratch.display().to_string()
        ),
    )
    .unwrap();
    path
}

#[test]
fn binary_responds_to_help() {
    let output = sparkdef()
        .arg("--help")
        .output()
        .expect("failed to execute sparkdef");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run"));
    assert!(stdout.contains("complete"));
    assert!(stdout.contains("list"));
}

#[test]
fn list_shows_builtin_interpreters() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_without_jdk(&tmp);
    let output = sparkdef()
        .arg("--config")
        .arg(&config)
        .arg("list")
        .output()
        .expect("failed to execute sparkdef list");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("%spark.define"));
    assert!(stdout.contains("%spark.dep"));
}

#[test]
fn complete_goes_through_dependency_loader() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_without_jdk(&tmp);
    let output = sparkdef()
        .arg("--config")
        .arg(&config)
        .args(["complete", "z.re"])
        .output()
        .expect("failed to execute sparkdef complete");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "z.reset()");
}

#[test]
fn run_without_compiler_fails_cleanly() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_without_jdk(&tmp);
    let source = tmp.path().join("Foo.java");
    std::fs::write(&source, "class Foo {}").unwrap();

    let output = sparkdef()
        .arg("--config")
        .arg(&config)
        .arg("--json")
        .arg("run")
        .arg(&source)
        .output()
        .expect("failed to execute sparkdef run");

    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["result"]["code"], "error");
    assert!(
        report["result"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Cannot run compiler")
    );
    assert_eq!(report["loaded"], serde_json::json!([]));
}

#[test]
fn run_reports_missing_file() {
    let output = sparkdef()
        .args(["run", "/nonexistent/Foo.java"])
        .output()
        .expect("failed to execute sparkdef run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/Foo.java"));
}
