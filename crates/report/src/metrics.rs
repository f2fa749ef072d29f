// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level run metrics.

use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const METRICS_FILE: &str = "metrics.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub took_ms: u64,
}

impl RunMetrics {
    pub fn new(took_ms: u64) -> Self {
        Self { took_ms }
    }

    /// Write `metrics.json` into the given directory
    pub fn to_dir(&self, dir: &Path) -> Result<(), ReportError> {
        let path = dir.join(METRICS_FILE);
        let json = serde_json::to_string(self)?;
        std::fs::write(&path, json).map_err(|e| ReportError::io(&path, e))
    }

    /// Read `metrics.json` from the given directory; `None` if it was never written
    pub fn of_dir(dir: &Path) -> Result<Option<Self>, ReportError> {
        let path = dir.join(METRICS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReportError::io(&path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ReportError::Corrupt {
                path,
                line: 1,
                source,
            })
    }
}
