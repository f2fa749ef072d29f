// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tri-state case verdict.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one case.
///
/// Ordering follows severity: `Ok < Diff < Fail`, so the verdict of a run is
/// the maximum over its cases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "DIFF")]
    Diff,
    #[serde(rename = "FAIL")]
    Fail,
}

impl Verdict {
    /// Derive a verdict from the counters a case accumulated.
    ///
    /// Failures dominate differences; a missing baseline is always a
    /// difference.
    pub fn from_counts(errors: usize, diffs: usize, baseline_exists: bool) -> Self {
        if errors > 0 {
            Verdict::Fail
        } else if diffs > 0 || !baseline_exists {
            Verdict::Diff
        } else {
            Verdict::Ok
        }
    }

    pub fn is_ok(self) -> bool {
        self == Verdict::Ok
    }

    /// The more severe of two verdicts.
    pub fn worst(self, other: Verdict) -> Verdict {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::Diff => "DIFF",
            Verdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "verdict_tests.rs"]
mod tests;
