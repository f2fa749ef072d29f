// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration loaded from `snapbook.toml`, overridden by
//! `SNAPBOOK_*` environment variables and finally by command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::layout::BookLayout;

/// Name of the optional configuration file at the project root.
pub const CONFIG_FILE: &str = "snapbook.toml";

/// Default coordinator polling interval in milliseconds.
pub const DEFAULT_POLL_MS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Accepted baselines, relative to the project root
    pub books_dir: PathBuf,

    /// Run output, relative to the project root
    pub out_dir: PathBuf,

    /// Selection used when none is given on the command line
    pub default_selection: Vec<String>,

    /// Use the concurrent scheduler
    pub parallel: bool,

    /// Worker limit for the concurrent scheduler (default: available cores)
    pub workers: Option<usize>,

    /// Stop dispatching after the first failure
    pub fail_fast: bool,

    /// Only re-run cases that did not pass in the previous run
    pub continue_run: bool,

    /// Re-run dependencies even when a cached result exists
    pub refresh_dependencies: bool,

    /// Freeze differing output as the new baseline
    pub accept: bool,

    /// Freeze passing output as well
    pub update: bool,

    /// Print each failing case's report to the console
    pub verbose: bool,

    /// Add a caret line under the first mismatch on each line
    pub point_error_pos: bool,

    /// Per-case wall-clock budget
    pub timeout_ms: Option<u64>,

    /// Coordinator polling interval
    pub poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            books_dir: PathBuf::from("books"),
            out_dir: PathBuf::from("books/.out"),
            default_selection: vec![crate::selection::ALL.to_string()],
            parallel: false,
            workers: None,
            fail_fast: false,
            continue_run: false,
            refresh_dependencies: false,
            accept: false,
            update: false,
            verbose: false,
            point_error_pos: false,
            timeout_ms: None,
            poll_ms: DEFAULT_POLL_MS,
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Defaults, then `<root>/snapbook.toml` if present, then the environment.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content, &path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `SNAPBOOK_*` variables that are set.
    pub fn apply_env(&mut self) {
        if let Some(v) = env::books_dir() {
            self.books_dir = v;
        }
        if let Some(v) = env::out_dir() {
            self.out_dir = v;
        }
        if let Some(v) = env::default_selection() {
            self.default_selection = v;
        }
        if let Some(v) = env::workers() {
            self.workers = Some(v);
        }
        if let Some(v) = env::timeout_ms() {
            self.timeout_ms = Some(v);
        }
        if let Some(v) = env::poll_ms() {
            self.poll_ms = v;
        }
        let flags: [(&mut bool, Option<bool>); 8] = [
            (&mut self.parallel, env::parallel()),
            (&mut self.fail_fast, env::fail_fast()),
            (&mut self.continue_run, env::continue_run()),
            (&mut self.refresh_dependencies, env::refresh_dependencies()),
            (&mut self.accept, env::accept()),
            (&mut self.update, env::update()),
            (&mut self.verbose, env::verbose()),
            (&mut self.point_error_pos, env::point_error_pos()),
        ];
        for (field, value) in flags {
            if let Some(v) = value {
                *field = v;
            }
        }
    }

    /// Directory layout with relative paths resolved against `root`.
    pub fn layout(&self, root: &Path) -> BookLayout {
        BookLayout::new(root.join(&self.books_dir), root.join(&self.out_dir))
    }

    /// Effective worker count, never zero.
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
