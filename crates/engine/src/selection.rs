// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Case selection by path prefix.
//!
//! A selection is a list of entries. `*` selects every case, `a/b` selects
//! `a/b` and everything below it, and `skip:a/b` excludes them. Prefixes
//! only match at `/` boundaries, so `a/b` does not select `a/bc`. A
//! selection made only of `skip:` entries selects everything not skipped.

pub const SKIP_PREFIX: &str = "skip:";
pub const ALL: &str = "*";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<String>,
}

impl Selection {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn all() -> Self {
        Self::new([ALL])
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a `skip:` entry excludes `path`.
    pub fn is_skipped(&self, path: &str) -> bool {
        self.entries
            .iter()
            .filter_map(|entry| entry.strip_prefix(SKIP_PREFIX))
            .any(|prefix| matches_prefix(path, prefix))
    }

    pub fn is_selected(&self, path: &str) -> bool {
        if self.is_skipped(path) {
            return false;
        }
        let mut positives = self
            .entries
            .iter()
            .filter(|entry| !entry.starts_with(SKIP_PREFIX))
            .peekable();
        if positives.peek().is_none() {
            return true;
        }
        positives.any(|entry| entry == ALL || matches_prefix(path, entry))
    }
}

/// `prefix` equals `path` or names one of its ancestors.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.is_empty() || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
#[path = "selection_tests.rs"]
mod tests;
