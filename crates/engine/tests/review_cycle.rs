// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! End-to-end runs of the demo book through the `snapbook` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn snapbook(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("snapbook").unwrap();
    cmd.arg("--root").arg(root.path());
    for (name, _) in std::env::vars() {
        if name.starts_with("SNAPBOOK_") {
            cmd.env_remove(name);
        }
    }
    cmd
}

#[test]
fn first_run_differs_then_accept_then_pass() {
    let root = TempDir::new().unwrap();

    snapbook(&root)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("# test results:"))
        .stdout(predicate::str::contains("demo/corpus/stats - DIFFERED in"))
        .stdout(predicate::str::contains("differed and 0 failed"));

    snapbook(&root).arg("-a").assert().code(0);
    assert!(root.path().join("books/demo/corpus/stats.md").is_file());

    snapbook(&root)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("test succeeded in"));

    snapbook(&root)
        .args(["-p", "--workers", "3"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("test succeeded in"));
}

#[test]
fn list_includes_pulled_dependencies() {
    let root = TempDir::new().unwrap();
    snapbook(&root)
        .args(["-l", "demo/corpus/report"])
        .assert()
        .code(0)
        .stdout("demo/corpus/stats\ndemo/corpus/report\n");
}

#[test]
fn path_prints_baseline_files() {
    let root = TempDir::new().unwrap();
    snapbook(&root)
        .args(["--path", "demo/tokens"])
        .assert()
        .code(0)
        .stdout(predicate::str::ends_with("books/demo/tokens.md\n"));
}

#[test]
fn skipped_dependency_fails_dependent() {
    let root = TempDir::new().unwrap();
    snapbook(&root)
        .args(["demo/corpus/report", "skip:demo/corpus/stats"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("demo/corpus/report - FAILED in"));
}

#[test]
fn review_reports_previous_run() {
    let root = TempDir::new().unwrap();
    snapbook(&root).arg("demo/tokens").assert().code(1);
    snapbook(&root)
        .arg("--review")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("demo/tokens - DIFFERED in"))
        .stdout(predicate::str::contains("1/1 test 1 differed and 0 failed"));
}

#[test]
fn invalid_config_exits_with_error() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("snapbook.toml"), "paralel = true\n").unwrap();
    snapbook(&root)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn config_file_selects_default_cases() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("snapbook.toml"),
        "default_selection = [\"demo/servers\"]\nout_dir = \"target-out\"\n",
    )
    .unwrap();
    snapbook(&root)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("demo/servers/gamma - DIFFERED"))
        .stdout(predicate::str::contains("demo/tokens").not());
    assert!(root.path().join("target-out/cases.ndjson").is_file());
}
