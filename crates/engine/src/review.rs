// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Freezing run output into accepted baselines.

use crate::error::EngineError;
use crate::layout::BookLayout;
use snapbook_report::Verdict;
use std::path::Path;
use tracing::info;

/// What to do with finished cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReviewPolicy {
    /// Freeze DIFF output and report it as OK
    pub accept: bool,
    /// Freeze OK output, refreshing the baseline
    pub update: bool,
}

impl ReviewPolicy {
    pub fn new(accept: bool, update: bool) -> Self {
        Self { accept, update }
    }

    /// Apply the policy to a finished case and return its final verdict.
    ///
    /// FAIL output is never frozen.
    pub fn review(
        &self,
        layout: &BookLayout,
        path: &str,
        verdict: Verdict,
    ) -> Result<Verdict, EngineError> {
        match verdict {
            Verdict::Diff if self.accept => {
                freeze_case(layout, path)?;
                Ok(Verdict::Ok)
            }
            Verdict::Ok if self.update => {
                freeze_case(layout, path)?;
                Ok(Verdict::Ok)
            }
            other => Ok(other),
        }
    }
}

/// Promote a case's output to its baseline.
///
/// The output file replaces the baseline file, and the output asset
/// directory replaces the baseline asset directory.
pub fn freeze_case(layout: &BookLayout, path: &str) -> Result<(), EngineError> {
    let baseline_assets = layout.baseline_assets(path);
    if baseline_assets.is_dir() {
        std::fs::remove_dir_all(&baseline_assets)
            .map_err(|e| EngineError::io(&baseline_assets, e))?;
    }

    let baseline = layout.baseline_file(path);
    ensure_parent(&baseline)?;
    let output = layout.output_file(path);
    move_path(&output, &baseline)?;

    let output_assets = layout.output_assets(path);
    if output_assets.is_dir() {
        move_path(&output_assets, &baseline_assets)?;
    }

    info!(case = path, baseline = %baseline.display(), "froze case output");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), EngineError> {
    match path.parent() {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))
        }
        None => Ok(()),
    }
}

/// Rename, falling back to copy-and-remove across filesystems.
fn move_path(from: &Path, to: &Path) -> Result<(), EngineError> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    if from.is_dir() {
        copy_dir(from, to)?;
        std::fs::remove_dir_all(from).map_err(|e| EngineError::io(from, e))
    } else {
        std::fs::copy(from, to).map_err(|e| EngineError::io(from, e))?;
        std::fs::remove_file(from).map_err(|e| EngineError::io(from, e))
    }
}

fn copy_dir(from: &Path, to: &Path) -> Result<(), EngineError> {
    std::fs::create_dir_all(to).map_err(|e| EngineError::io(to, e))?;
    let entries = std::fs::read_dir(from).map_err(|e| EngineError::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(from, e))?;
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| EngineError::io(entry.path(), e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
