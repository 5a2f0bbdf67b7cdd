// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the `nodeflow` binary.

use std::path::PathBuf;
use std::process::{Command, Output};

fn nodeflow() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nodeflow"))
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("nodeflow-cli-{}-{name}", std::process::id()))
}

fn run(args: &[&str]) -> Output {
    nodeflow().args(args).output().expect("failed to run nodeflow")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_demo(name: &str) -> PathBuf {
    let path = scratch(name);
    let output = run(&["demo", "--out", path.to_str().unwrap()]);
    assert!(output.status.success(), "demo failed: {}", String::from_utf8_lossy(&output.stderr));
    path
}

#[test]
fn cli_demo_writes_graph() {
    let path = write_demo("demo.graph");
    assert!(path.exists());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn cli_eval_json_report() {
    let path = write_demo("eval.graph");
    let output = run(&["eval", path.to_str().unwrap(), "--json"]);
    let _ = std::fs::remove_file(&path);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["calculated"], 3);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["nodes"][1]["name"], "Add");
    assert_eq!(report["nodes"][1]["outputs"][0]["value"], "2");
    assert_eq!(report["nodes"][2]["outputs"][0]["value"], "2\n2");
}

#[test]
fn cli_inspect_lists_structure() {
    let path = write_demo("inspect.graph");
    let output = run(&["inspect", path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("Nodes:       3"));
    assert!(text.contains("Constant.out -> Add.a"));
    assert!(text.contains("Selection:   Add"));
    assert!(text.contains("Sum (2 nodes)"));
}

#[test]
fn cli_verify_accepts_demo() {
    let path = write_demo("verify.graph");
    let output = run(&["verify", path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("OK: "));
}

#[test]
fn cli_rejects_garbage_file() {
    let path = scratch("garbage.graph");
    std::fs::write(&path, b"not a graph").unwrap();
    let output = run(&["eval", path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);
    assert!(!output.status.success());
}

#[test]
fn cli_config_round_trip() {
    let path = scratch("config.ron");
    std::fs::write(&path, "(viewer_lines: 1, pretty_json: false)").unwrap();
    let output = run(&["--config", path.to_str().unwrap(), "config"]);
    let _ = std::fs::remove_file(&path);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("viewer_lines: 1"));
    assert!(text.contains("pretty_json: false"));
}

#[test]
fn cli_newer_config_rejected() {
    let path = scratch("future.ron");
    std::fs::write(&path, "(version: 42)").unwrap();
    let output = run(&["--config", path.to_str().unwrap(), "config"]);
    let _ = std::fs::remove_file(&path);
    assert_eq!(output.status.code(), Some(2));
}
