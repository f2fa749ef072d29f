// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reading back a run's report log.

use crate::entry::CaseEntry;
use crate::error::ReportError;
use crate::verdict::Verdict;
use std::collections::HashSet;
use std::path::Path;

/// Entries of a previously written report log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaseReports {
    entries: Vec<CaseEntry>,
}

/// Cases a run must execute versus cases it can carry over.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContinuePlan {
    /// Entries carried over unchanged from the previous report
    pub done: Vec<CaseEntry>,
    /// Case paths still to execute, in selection order
    pub todo: Vec<String>,
}

/// Pass/fail counts over a set of entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub diff: usize,
    pub fail: usize,
}

impl CaseReports {
    pub fn new(entries: Vec<CaseEntry>) -> Self {
        Self { entries }
    }

    /// Read a report log. A missing file reads as an empty report.
    ///
    /// A trailing line without a newline is an interrupted write and is
    /// ignored. Any other unparseable line is a corrupt report.
    pub fn read(path: &Path) -> Result<Self, ReportError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ReportError::io(path, e)),
        };
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ReportError> {
        let mut lines: Vec<&str> = content.split('\n').collect();
        // Either the empty tail after the final newline, or a partial write.
        lines.pop();

        let mut entries = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: CaseEntry =
                serde_json::from_str(line).map_err(|source| ReportError::Corrupt {
                    path: path.to_path_buf(),
                    line: index + 1,
                    source,
                })?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CaseEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CaseEntry> {
        self.entries
    }

    /// Latest entry recorded for a case path
    pub fn get(&self, path: &str) -> Option<&CaseEntry> {
        self.entries.iter().rev().find(|e| e.path == path)
    }

    pub fn passed(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.verdict.is_ok())
            .map(|e| e.path.as_str())
            .collect()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.verdict.is_ok())
            .map(|e| e.path.as_str())
            .collect()
    }

    /// Drop entries whose case path is not accepted by `keep`
    pub fn retain_paths<F: Fn(&str) -> bool>(&mut self, keep: F) {
        self.entries.retain(|e| keep(&e.path));
    }

    /// Split a selection into carried-over and pending cases.
    ///
    /// With `continue_run`, selected cases whose previous verdict was OK are
    /// carried over. Without it every selected case is pending.
    pub fn plan_continue(&self, selection: &[String], continue_run: bool) -> ContinuePlan {
        if !continue_run {
            return ContinuePlan {
                done: Vec::new(),
                todo: selection.to_vec(),
            };
        }

        let mut plan = ContinuePlan::default();
        let mut carried = HashSet::new();
        for path in selection {
            match self.get(path) {
                Some(entry) if entry.verdict.is_ok() && carried.insert(path.as_str()) => {
                    plan.done.push(entry.clone());
                }
                _ => plan.todo.push(path.clone()),
            }
        }
        plan
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.entries)
    }
}

impl Summary {
    pub fn of(entries: &[CaseEntry]) -> Self {
        let mut summary = Summary::default();
        for entry in entries {
            summary.add(entry.verdict);
        }
        summary
    }

    pub fn add(&mut self, verdict: Verdict) {
        self.total += 1;
        match verdict {
            Verdict::Ok => self.ok += 1,
            Verdict::Diff => self.diff += 1,
            Verdict::Fail => self.fail += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.diff + self.fail
    }

    /// Worst verdict over the summarized entries; OK for an empty run
    pub fn verdict(&self) -> Verdict {
        if self.fail > 0 {
            Verdict::Fail
        } else if self.diff > 0 {
            Verdict::Diff
        } else {
            Verdict::Ok
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
