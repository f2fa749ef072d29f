// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of baselines and run output.
//!
//! Pure path computation, no I/O. A case `area/group/name` maps to:
//!
//! | file                         | purpose                          |
//! |------------------------------|----------------------------------|
//! | `<books>/area/group/name.md` | accepted baseline                |
//! | `<books>/area/group/name/`   | baseline assets                  |
//! | `<out>/area/group/name.md`   | live output of the last run      |
//! | `<out>/area/group/name.txt`  | review report of the last run    |
//! | `<out>/area/group/name/`     | assets written during the run    |
//! | `<out>/area/group/name.tmp/` | scratch space, purged every run  |
//! | `<out>/area/group/name.json` | cached return value              |

use std::path::{Path, PathBuf};

/// Name of the per-run case report log inside the out dir.
pub const CASES_FILE: &str = "cases.ndjson";

#[derive(Clone, Debug)]
pub struct BookLayout {
    books_dir: PathBuf,
    out_dir: PathBuf,
}

impl BookLayout {
    pub fn new(books_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            books_dir: books_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn books_dir(&self) -> &Path {
        &self.books_dir
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn baseline_file(&self, case: &str) -> PathBuf {
        with_suffix(&self.books_dir, case, ".md")
    }

    pub fn baseline_assets(&self, case: &str) -> PathBuf {
        with_suffix(&self.books_dir, case, "")
    }

    pub fn output_file(&self, case: &str) -> PathBuf {
        with_suffix(&self.out_dir, case, ".md")
    }

    pub fn report_file(&self, case: &str) -> PathBuf {
        with_suffix(&self.out_dir, case, ".txt")
    }

    pub fn output_assets(&self, case: &str) -> PathBuf {
        with_suffix(&self.out_dir, case, "")
    }

    pub fn tmp_dir(&self, case: &str) -> PathBuf {
        with_suffix(&self.out_dir, case, ".tmp")
    }

    pub fn cache_file(&self, case: &str) -> PathBuf {
        with_suffix(&self.out_dir, case, ".json")
    }

    pub fn cases_file(&self) -> PathBuf {
        self.out_dir.join(CASES_FILE)
    }
}

fn with_suffix(root: &Path, case: &str, suffix: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in case.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    let mut name = path.into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
