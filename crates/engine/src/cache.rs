// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cached case return values.
//!
//! Values are kept in memory for the run and persisted as JSON next to the
//! case output, so a later run (or another process) can consume them.

use crate::error::EngineError;
use crate::layout::BookLayout;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

pub struct ResultCache {
    layout: BookLayout,
    memory: HashMap<String, Value>,
}

impl ResultCache {
    pub fn new(layout: BookLayout) -> Self {
        Self {
            layout,
            memory: HashMap::new(),
        }
    }

    /// Whether a result is available in memory or on disk.
    pub fn contains(&self, path: &str) -> bool {
        self.memory.contains_key(path) || self.layout.cache_file(path).is_file()
    }

    /// Cached result of `path`, or `None` if the case has no result.
    ///
    /// An unreadable cache file is fatal.
    pub fn get(&mut self, path: &str) -> Result<Option<Value>, EngineError> {
        if let Some(value) = self.memory.get(path) {
            return Ok(Some(value.clone()));
        }

        let file = self.layout.cache_file(path);
        let content = match std::fs::read_to_string(&file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EngineError::io(file, e)),
        };
        let value: Value = serde_json::from_str(&content)
            .map_err(|source| EngineError::CorruptCache { path: file, source })?;
        debug!(case = path, "loaded cached result");
        self.memory.insert(path.to_string(), value.clone());
        Ok(Some(value))
    }

    /// Store the result of `path`.
    ///
    /// `None` is persisted as `null`, so a case that ran without returning
    /// a value still satisfies its dependents in later runs.
    pub fn store(&mut self, path: &str, value: Option<Value>) -> Result<(), EngineError> {
        let value = value.unwrap_or(Value::Null);
        let file = self.layout.cache_file(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        let json = serde_json::to_string(&value).map_err(|source| EngineError::CorruptCache {
            path: file.clone(),
            source,
        })?;
        std::fs::write(&file, json).map_err(|e| EngineError::io(&file, e))?;
        debug!(case = path, "stored result");
        self.memory.insert(path.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
