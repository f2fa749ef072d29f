// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only report log.

use crate::entry::CaseEntry;
use crate::error::ReportError;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Report log for recording case verdicts as they complete.
///
/// Every entry is written as one JSON line and flushed immediately; a crash
/// between two writes loses at most the entry being written.
pub struct ReportLog {
    entries: Arc<Mutex<Vec<CaseEntry>>>,
    file_writer: Option<Arc<Mutex<FileSink>>>,
}

struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ReportLog {
    /// Create an in-memory report log
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            file_writer: None,
        }
    }

    /// Create a report log that truncates and writes to a file (JSONL format)
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| ReportError::io(path, e))?;
        Ok(Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            file_writer: Some(Arc::new(Mutex::new(FileSink {
                path: path.to_path_buf(),
                writer: BufWriter::new(file),
            }))),
        })
    }

    /// Record an entry, making it durable before returning
    pub fn record(&self, entry: CaseEntry) -> Result<(), ReportError> {
        if let Some(ref sink) = self.file_writer {
            let json = serde_json::to_string(&entry)?;
            let mut sink = sink.lock();
            let path = sink.path.clone();
            writeln!(sink.writer, "{}", json).map_err(|e| ReportError::io(&path, e))?;
            sink.writer.flush().map_err(|e| ReportError::io(&path, e))?;
        }
        self.entries.lock().push(entry);
        Ok(())
    }

    /// Get all recorded entries
    pub fn entries(&self) -> Vec<CaseEntry> {
        self.entries.lock().clone()
    }

    /// Find the entry for a case path
    pub fn find(&self, path: &str) -> Option<CaseEntry> {
        self.entries.lock().iter().find(|e| e.path == path).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for ReportLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ReportLog {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            file_writer: self.file_writer.as_ref().map(Arc::clone),
        }
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
