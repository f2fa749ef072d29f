// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine.
//!
//! [`EngineError`] stops a run. [`CaseError`] is what a case body returns;
//! it never escapes the case and is recorded as a `FAIL` verdict.

use crate::config::ConfigError;
use snapbook_report::ReportError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that end a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("corrupt cached result '{}': {source}", path.display())]
    CorruptCache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("case '{0}' is registered twice")]
    DuplicateCase(String),

    #[error("case '{case}' depends on an unregistered case")]
    UnknownDependency { case: String },

    #[error("dependency cycle through '{0}'")]
    DependencyCycle(String),

    #[error("unknown case '{0}'")]
    UnknownCase(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by case bodies.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("missing dependency result: {0}")]
    MissingDependency(String),

    #[error("dependency {index} has an unexpected shape: {source}")]
    DependencyShape {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl CaseError {
    pub fn msg(message: impl Into<String>) -> Self {
        CaseError::Message(message.into())
    }
}
