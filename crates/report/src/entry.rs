// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Report entry data type.

use crate::duration_serde;
use crate::verdict::Verdict;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One executed case in a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseEntry {
    /// Hierarchical case path, e.g. `area/group/name`
    pub path: String,

    pub verdict: Verdict,

    /// Wall-clock duration of the case
    #[serde(rename = "duration_ms", with = "duration_serde")]
    pub duration: Duration,
}

impl CaseEntry {
    pub fn new(path: impl Into<String>, verdict: Verdict, duration: Duration) -> Self {
        Self {
            path: path.into(),
            verdict,
            duration,
        }
    }
}
