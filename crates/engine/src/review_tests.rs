// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use tempfile::TempDir;

fn layout() -> (TempDir, BookLayout) {
    let dir = TempDir::new().unwrap();
    let layout = BookLayout::new(dir.path().join("books"), dir.path().join("books/.out"));
    (dir, layout)
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn freeze_moves_output_and_assets() {
    let (_dir, layout) = layout();
    write(&layout.output_file("suite/case"), "new\n");
    write(&layout.output_assets("suite/case").join("image.png"), "png");
    write(&layout.baseline_file("suite/case"), "old\n");
    write(&layout.baseline_assets("suite/case").join("stale.png"), "stale");

    freeze_case(&layout, "suite/case").unwrap();

    let baseline = std::fs::read_to_string(layout.baseline_file("suite/case")).unwrap();
    assert_eq!(baseline, "new\n");
    assert!(!layout.output_file("suite/case").exists());
    assert!(layout.baseline_assets("suite/case").join("image.png").is_file());
    assert!(!layout.baseline_assets("suite/case").join("stale.png").exists());
    assert!(!layout.output_assets("suite/case").exists());
}

#[test]
fn freeze_without_output_is_an_error() {
    let (_dir, layout) = layout();
    std::fs::create_dir_all(layout.books_dir()).unwrap();
    assert!(matches!(
        freeze_case(&layout, "missing"),
        Err(EngineError::Io { .. })
    ));
}

#[test]
fn accept_freezes_diff_as_ok() {
    let (_dir, layout) = layout();
    write(&layout.output_file("a"), "out\n");
    let policy = ReviewPolicy::new(true, false);
    assert_eq!(policy.review(&layout, "a", Verdict::Diff).unwrap(), Verdict::Ok);
    assert!(layout.baseline_file("a").is_file());
}

#[test]
fn update_freezes_ok_only() {
    let (_dir, layout) = layout();
    write(&layout.output_file("a"), "out\n");
    let policy = ReviewPolicy::new(false, true);

    assert_eq!(policy.review(&layout, "a", Verdict::Diff).unwrap(), Verdict::Diff);
    assert!(!layout.baseline_file("a").exists());

    assert_eq!(policy.review(&layout, "a", Verdict::Ok).unwrap(), Verdict::Ok);
    assert!(layout.baseline_file("a").is_file());
}

#[test]
fn fail_is_never_frozen() {
    let (_dir, layout) = layout();
    write(&layout.output_file("a"), "out\n");
    let policy = ReviewPolicy::new(true, true);
    assert_eq!(policy.review(&layout, "a", Verdict::Fail).unwrap(), Verdict::Fail);
    assert!(!layout.baseline_file("a").exists());
}

#[test]
fn default_policy_leaves_output_alone() {
    let (_dir, layout) = layout();
    write(&layout.output_file("a"), "out\n");
    let policy = ReviewPolicy::default();
    assert_eq!(policy.review(&layout, "a", Verdict::Diff).unwrap(), Verdict::Diff);
    assert!(layout.output_file("a").is_file());
}
