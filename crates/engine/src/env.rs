// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by snapbook are defined here.
//! Use these accessors instead of calling `std::env::var()` directly.
//! Unparseable values are logged and ignored.

/// Generated env var name constants.
mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

// Re-export name constants for callers that need the raw name string.
pub use names::*;

use std::path::PathBuf;
use tracing::warn;

/// `SNAPBOOK_BOOKS_DIR`: Directory of accepted baselines.
pub fn books_dir() -> Option<PathBuf> {
    std::env::var(names::SNAPBOOK_BOOKS_DIR)
        .ok()
        .map(PathBuf::from)
}

/// `SNAPBOOK_OUT_DIR`: Directory of run output.
pub fn out_dir() -> Option<PathBuf> {
    std::env::var(names::SNAPBOOK_OUT_DIR).ok().map(PathBuf::from)
}

/// `SNAPBOOK_DEFAULT_SELECTION`: Comma-separated selection used when none
/// is given on the command line.
pub fn default_selection() -> Option<Vec<String>> {
    std::env::var(names::SNAPBOOK_DEFAULT_SELECTION)
        .ok()
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
}

pub fn parallel() -> Option<bool> {
    var_bool(names::SNAPBOOK_PARALLEL)
}

pub fn workers() -> Option<usize> {
    var_u64(names::SNAPBOOK_WORKERS).map(|n| n as usize)
}

pub fn fail_fast() -> Option<bool> {
    var_bool(names::SNAPBOOK_FAIL_FAST)
}

pub fn continue_run() -> Option<bool> {
    var_bool(names::SNAPBOOK_CONTINUE_RUN)
}

pub fn refresh_dependencies() -> Option<bool> {
    var_bool(names::SNAPBOOK_REFRESH_DEPENDENCIES)
}

pub fn accept() -> Option<bool> {
    var_bool(names::SNAPBOOK_ACCEPT)
}

pub fn update() -> Option<bool> {
    var_bool(names::SNAPBOOK_UPDATE)
}

pub fn verbose() -> Option<bool> {
    var_bool(names::SNAPBOOK_VERBOSE)
}

pub fn point_error_pos() -> Option<bool> {
    var_bool(names::SNAPBOOK_POINT_ERROR_POS)
}

/// `SNAPBOOK_TIMEOUT_MS`: Per-case wall-clock budget.
pub fn timeout_ms() -> Option<u64> {
    var_u64(names::SNAPBOOK_TIMEOUT_MS)
}

/// `SNAPBOOK_POLL_MS`: Coordinator polling interval.
pub fn poll_ms() -> Option<u64> {
    var_u64(names::SNAPBOOK_POLL_MS)
}

/// `SNAPBOOK_LOG`: Log filter directive for the binary.
pub fn log_filter() -> Option<String> {
    std::env::var(names::SNAPBOOK_LOG).ok()
}

fn var_u64(name: &str) -> Option<u64> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(var = name, value = %value, "ignoring non-numeric value");
            None
        }
    }
}

fn var_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => {
            warn!(var = name, value = %value, "ignoring non-boolean value");
            None
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
