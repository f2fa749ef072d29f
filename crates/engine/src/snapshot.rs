// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Forward-reading cursor over a stored baseline.
//!
//! The cursor exposes the baseline line by line and, within the current
//! line, token by token. Baseline I/O is forward-only: moving backwards
//! reopens the baseline and reads forward again.

use crate::token::{Token, TokenCursor};
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a case's accepted baseline lives.
#[derive(Clone, Debug)]
pub enum Baseline {
    /// A baseline file; a missing file means no baseline exists.
    File(PathBuf),
    /// An in-memory baseline.
    Text(Arc<str>),
    /// No baseline at all (first run).
    Missing,
}

impl Baseline {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Baseline::File(path.into())
    }

    pub fn text(text: &str) -> Self {
        Baseline::Text(Arc::from(text))
    }

    pub fn exists(&self) -> bool {
        match self {
            Baseline::File(path) => path.is_file(),
            Baseline::Text(_) => true,
            Baseline::Missing => false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Baseline::File(path) => Some(path),
            _ => None,
        }
    }

    fn open(&self) -> std::io::Result<Option<Box<dyn BufRead + Send>>> {
        match self {
            Baseline::File(path) => match std::fs::File::open(path) {
                Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            },
            Baseline::Text(text) => Ok(Some(Box::new(Cursor::new(text.as_bytes().to_vec())))),
            Baseline::Missing => Ok(None),
        }
    }
}

/// Cursor over the lines and tokens of a baseline.
///
/// Line numbers are 1-based: after [`reset`](Self::reset) the cursor sits on
/// line 1. Reading past the last line leaves the cursor on a stable "missing"
/// line (`line()` returns `None`) instead of failing.
pub struct SnapshotCursor {
    baseline: Baseline,
    exists: bool,
    reader: Option<Box<dyn BufRead + Send>>,
    line: Option<String>,
    tokens: Option<TokenCursor>,
    line_number: usize,
}

impl SnapshotCursor {
    /// Open a cursor positioned on the first baseline line.
    pub fn open(baseline: Baseline) -> std::io::Result<Self> {
        let exists = baseline.exists();
        let mut cursor = Self {
            baseline,
            exists,
            reader: None,
            line: None,
            tokens: None,
            line_number: 0,
        };
        cursor.reset()?;
        Ok(cursor)
    }

    /// Whether a baseline existed when the cursor was opened.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// The current baseline line, or `None` past the end.
    pub fn line(&self) -> Option<&str> {
        self.line.as_deref()
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Reopen the baseline and move to line 1.
    pub fn reset(&mut self) -> std::io::Result<()> {
        self.reader = if self.exists {
            self.baseline.open()?
        } else {
            None
        };
        self.line = None;
        self.tokens = None;
        self.line_number = 0;
        self.next_line()
    }

    /// Advance to the next baseline line.
    pub fn next_line(&mut self) -> std::io::Result<()> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };

        let mut buf = String::new();
        let read = reader.read_line(&mut buf)?;
        self.line_number += 1;
        if read == 0 {
            self.reader = None;
            self.line = None;
            self.tokens = None;
        } else {
            if buf.ends_with('\n') {
                buf.pop();
            }
            self.tokens = Some(TokenCursor::new(buf.clone()));
            self.line = Some(buf);
        }
        Ok(())
    }

    /// Look at the next baseline token without consuming it.
    ///
    /// At the end of a line this is a newline token; past the end of the
    /// baseline it is `None`.
    pub fn peek_token(&self) -> Option<Token> {
        self.tokens
            .as_ref()
            .map(|tokens| tokens.peek().unwrap_or_else(Token::newline))
    }

    /// Consume the next baseline token (same conventions as `peek_token`).
    pub fn next_token(&mut self) -> Option<Token> {
        self.tokens.as_mut().map(|tokens| {
            let token = tokens.advance();
            if token.is_end() {
                Token::newline()
            } else {
                token
            }
        })
    }

    /// Move to `line_number`.
    ///
    /// Targets before the current position reopen the baseline and read
    /// forward.
    pub fn jump(&mut self, line_number: usize) -> std::io::Result<()> {
        if !self.exists {
            return Ok(());
        }
        if line_number < self.line_number {
            self.reset()?;
        }
        while self.line.is_some() && self.line_number < line_number {
            self.next_line()?;
        }
        Ok(())
    }

    /// Scan forward for a line matching `is_line_ok`, stopping at `end`.
    ///
    /// If the scan runs off the end of the baseline, scanning restarts at
    /// `begin` and continues up to the original position. When nothing
    /// matches, the cursor is left at `end` if the bound stopped the scan,
    /// otherwise at the original position.
    ///
    /// This is O(n) in the baseline size and, when the line is missing,
    /// reads the whole baseline. Returns whether a matching line was found.
    pub fn seek<F>(&mut self, is_line_ok: F, begin: usize, end: usize) -> std::io::Result<bool>
    where
        F: Fn(&str) -> bool,
    {
        if !self.exists {
            return Ok(false);
        }
        let at_line_number = self.line_number;

        self.scan_until(&is_line_ok, end)?;
        if self.line.is_none() {
            self.jump(begin)?;
            self.scan_until(&is_line_ok, at_line_number)?;
        }
        Ok(self.line.as_deref().is_some_and(is_line_ok))
    }

    fn scan_until<F>(&mut self, is_line_ok: &F, limit: usize) -> std::io::Result<()>
    where
        F: Fn(&str) -> bool,
    {
        loop {
            match self.line.as_deref() {
                Some(line) if !is_line_ok(line) && self.line_number < limit => {
                    self.next_line()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Seek the next line equal to `anchor`.
    pub fn seek_line(&mut self, anchor: &str) -> std::io::Result<bool> {
        self.seek(|line| line == anchor, 0, usize::MAX)
    }

    /// Seek the next line starting with `prefix`.
    pub fn seek_prefix(&mut self, prefix: &str) -> std::io::Result<bool> {
        self.seek(|line| line.starts_with(prefix), 0, usize::MAX)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
