// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-case execution context.
//!
//! A case writes its output through a [`CaseContext`]. Tested writes are
//! compared token by token against the baseline; info writes are recorded
//! but never compared. Output is buffered one line at a time and committed
//! when a newline token arrives, which also moves the baseline cursor to
//! its next line.

use crate::layout::BookLayout;
use crate::snapshot::{Baseline, SnapshotCursor};
use crate::time::{Clock, ClockHandle};
use crate::token::{Token, Tokenizer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use snapbook_report::Verdict;
use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Kind of problem recorded on an output line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkKind {
    Diff,
    Error,
}

/// A differing or failing output line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineMark {
    /// 1-based output line number
    pub line: usize,
    /// Character column of the first problem on the line
    pub column: usize,
    pub kind: MarkKind,
}

/// What a finished case context produced.
#[derive(Clone, Debug)]
pub struct CaseOutcome {
    pub verdict: Verdict,
    pub diffs: usize,
    pub errors: usize,
    pub marks: Vec<LineMark>,
    pub output: String,
    pub report: String,
    pub baseline_existed: bool,
}

pub struct CaseContext {
    path: String,
    layout: BookLayout,
    cursor: SnapshotCursor,
    clock: ClockHandle,
    point_error_pos: bool,

    output: String,
    report: String,
    out_line: String,

    line_diff: Option<usize>,
    line_error: Option<usize>,
    line_number: usize,
    diffs: usize,
    errors: usize,
    last_checked: bool,
    marks: Vec<LineMark>,
}

impl CaseContext {
    /// Open a context for `path` against its baseline file.
    ///
    /// Asset and scratch directories left by a previous run are purged.
    pub fn open(path: &str, layout: &BookLayout) -> std::io::Result<Self> {
        Self::with_baseline(path, layout, Baseline::file(layout.baseline_file(path)))
    }

    /// Open a context for `path` against an explicit baseline.
    pub fn with_baseline(
        path: &str,
        layout: &BookLayout,
        baseline: Baseline,
    ) -> std::io::Result<Self> {
        for dir in [layout.output_assets(path), layout.tmp_dir(path)] {
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir)?;
            }
        }

        Ok(Self {
            path: path.to_string(),
            layout: layout.clone(),
            cursor: SnapshotCursor::open(baseline)?,
            clock: ClockHandle::default(),
            point_error_pos: false,
            output: String::new(),
            report: String::new(),
            out_line: String::new(),
            line_diff: None,
            line_error: None,
            line_number: 0,
            diffs: 0,
            errors: 0,
            last_checked: false,
            marks: Vec::new(),
        })
    }

    pub fn with_clock(mut self, clock: ClockHandle) -> Self {
        self.clock = clock;
        self
    }

    /// Add a caret line under each marked line in the review report.
    pub fn with_point_error_pos(mut self, enabled: bool) -> Self {
        self.point_error_pos = enabled;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn clock(&self) -> &ClockHandle {
        &self.clock
    }

    pub fn baseline_exists(&self) -> bool {
        self.cursor.exists()
    }

    /// Number of committed output lines.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn diffs(&self) -> usize {
        self.diffs
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn marks(&self) -> &[LineMark] {
        &self.marks
    }

    /// Committed output so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    // -- token protocol --------------------------------------------------

    /// Feed a token that must match the baseline.
    pub fn feed_tested_token(&mut self, token: &Token) -> &mut Self {
        self.feed_token(token, true)
    }

    /// Feed a token that is recorded but never compared.
    pub fn feed_info_token(&mut self, token: &Token) -> &mut Self {
        self.feed_token(token, false)
    }

    fn feed_token(&mut self, token: &Token, check: bool) -> &mut Self {
        let expected = self.cursor.next_token();
        self.last_checked = check;
        if check && self.cursor.exists() {
            let offset = self.out_line.chars().count();
            match expected {
                Some(expected) if expected.text() == token.text() => {}
                Some(expected) => {
                    self.mark_diff(offset + common_prefix_chars(token.text(), expected.text()));
                }
                None => self.mark_diff(offset),
            }
        }

        if token.is_newline() {
            self.commit_line();
        } else {
            self.out_line.push_str(token.text());
        }
        self
    }

    /// Mark the current line as differing. The first mark on a line wins.
    pub fn diff(&mut self) -> &mut Self {
        let offset = self.out_line.chars().count();
        self.mark_diff(offset);
        self
    }

    /// Mark the current line as failed. The first mark on a line wins.
    pub fn fail(&mut self) -> &mut Self {
        if self.line_error.is_none() {
            self.line_error = Some(self.out_line.chars().count());
        }
        self
    }

    fn mark_diff(&mut self, column: usize) {
        if self.line_diff.is_none() {
            self.line_diff = Some(column);
        }
    }

    fn commit_line(&mut self) {
        let line = self.line_number + 1;
        if self.line_diff.is_some() || self.line_error.is_some() {
            let mut symbol = '?';
            let mut column = 0;
            if let Some(at) = self.line_diff.take() {
                self.diffs += 1;
                column = at;
                self.marks.push(LineMark {
                    line,
                    column: at,
                    kind: MarkKind::Diff,
                });
            }
            if let Some(at) = self.line_error.take() {
                symbol = '!';
                self.errors += 1;
                column = at;
                self.marks.push(LineMark {
                    line,
                    column: at,
                    kind: MarkKind::Error,
                });
            }
            let expected = self.cursor.line().unwrap_or("EOF");
            self.report
                .push_str(&format!("{symbol} {:60} | {expected}\n", self.out_line));
            if self.point_error_pos {
                self.report
                    .push_str(&format!("  {}^\n", " ".repeat(column)));
            }
        } else {
            self.report.push_str(&format!("  {}\n", self.out_line));
        }

        self.output.push_str(&self.out_line);
        self.output.push('\n');
        self.out_line.clear();
        self.with_cursor(SnapshotCursor::next_line);
        self.line_number = line;
    }

    /// Run a cursor operation; read failures fail the current line.
    fn with_cursor<T: Default>(
        &mut self,
        step: impl FnOnce(&mut SnapshotCursor) -> std::io::Result<T>,
    ) -> T {
        match step(&mut self.cursor) {
            Ok(value) => value,
            Err(e) => {
                warn!(case = %self.path, error = %e, "baseline read failed");
                self.fail();
                T::default()
            }
        }
    }

    // -- anchors -----------------------------------------------------------

    /// Write `prefix` as tested text after moving the baseline cursor to the
    /// next line starting with it.
    pub fn anchor(&mut self, prefix: &str) -> &mut Self {
        self.with_cursor(|c| c.seek_prefix(prefix));
        self.t(prefix)
    }

    /// Write `line` as a tested line after moving the baseline cursor to the
    /// next line equal to it.
    pub fn anchorln(&mut self, line: &str) -> &mut Self {
        self.with_cursor(|c| c.seek_line(line));
        self.tln(line)
    }

    /// Anchored line surrounded by blank lines.
    pub fn header(&mut self, text: &str) -> &mut Self {
        if self.line_number > 0 {
            let check = self.last_checked && self.cursor.line().is_some();
            self.feed_token(&Token::newline(), check);
        }
        self.anchorln(text);
        self.tln("")
    }

    pub fn h(&mut self, level: usize, title: &str) -> &mut Self {
        self.header(&format!("{} {title}", "#".repeat(level)))
    }

    pub fn h1(&mut self, title: &str) -> &mut Self {
        self.h(1, title)
    }

    pub fn h2(&mut self, title: &str) -> &mut Self {
        self.h(2, title)
    }

    pub fn h3(&mut self, title: &str) -> &mut Self {
        self.h(3, title)
    }

    // -- writing -----------------------------------------------------------

    /// Tested text.
    pub fn t(&mut self, text: &str) -> &mut Self {
        for token in Tokenizer::new(text) {
            self.feed_tested_token(&token);
        }
        self
    }

    /// Tested text followed by a newline.
    pub fn tln(&mut self, text: &str) -> &mut Self {
        self.t(text).feed_tested_token(&Token::newline())
    }

    /// Info text, never compared.
    pub fn i(&mut self, text: &str) -> &mut Self {
        for token in Tokenizer::new(text) {
            self.feed_info_token(&token);
        }
        self
    }

    /// Info text followed by a newline.
    pub fn iln(&mut self, text: &str) -> &mut Self {
        self.i(text).feed_info_token(&Token::newline())
    }

    /// `key value` line anchored on `key`.
    pub fn keyvalueln(&mut self, key: &str, value: impl Display) -> &mut Self {
        self.anchor(key).tln(&format!(" {value}"))
    }

    pub fn tlist<I>(&mut self, items: I, prefix: &str) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        for item in items {
            self.tln(&format!("{prefix}{item}"));
        }
        self
    }

    /// Compare `items` against the contiguous baseline lines starting with
    /// `prefix`, ignoring order.
    ///
    /// Items missing from the baseline mark their own line as differing;
    /// baseline items never written mark the line after the set.
    pub fn tset<I>(&mut self, items: I, prefix: &str) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let mut window = None;
        if self.cursor.line().is_some() {
            let begin = self.cursor.line_number();
            let mut expected = HashSet::new();
            while let Some(item) = self
                .cursor
                .line()
                .and_then(|line| line.strip_prefix(prefix))
                .map(str::to_string)
            {
                expected.insert(item);
                self.with_cursor(SnapshotCursor::next_line);
            }
            window = Some((begin, self.cursor.line_number(), expected));
        }

        for item in items {
            let item = item.to_string();
            let line = format!("{prefix}{item}");
            if let Some((begin, end, expected)) = window.as_mut() {
                if expected.remove(&item) {
                    let (begin, end) = (*begin, *end);
                    self.with_cursor(|c| c.seek(|l| l == line, begin, end));
                } else {
                    self.diff();
                }
            }
            self.iln(&line);
        }

        if let Some((_, end, expected)) = window {
            if !expected.is_empty() {
                self.diff();
            }
            self.with_cursor(|c| c.jump(end));
        }
        self
    }

    /// `ok` when `cond` holds, otherwise fail the line with `message`.
    pub fn assertln(&mut self, cond: bool, message: Option<&str>) -> &mut Self {
        if cond {
            self.iln("ok")
        } else {
            self.fail().iln(message.unwrap_or("FAILED"))
        }
    }

    /// Start a group of assertions about `value`.
    pub fn it<T>(&mut self, name: &str, value: T) -> Subject<'_, T> {
        self.h2(&format!("{name}.."));
        Subject {
            ctx: self,
            title: name.to_string(),
            it: value,
        }
    }

    fn must_line(&mut self, title: &str, ok: bool, message: Option<&str>) {
        self.i(&format!(" * MUST {title}...")).assertln(ok, message);
    }

    /// Info value annotated with the value currently in the baseline.
    pub fn ivalueln(&mut self, value: impl Display, unit: Option<&str>) -> &mut Self {
        let old = self.cursor.peek_token().filter(|t| !t.is_newline());
        let postfix = unit.map(|u| format!(" {u}")).unwrap_or_default();
        self.i(&format!("{value}{postfix}"));
        match old {
            Some(old) => self.iln(&format!(" (was {}{postfix})", old.text())),
            None => self.iln(""),
        }
    }

    /// Like [`ivalueln`](Self::ivalueln) with three decimals.
    pub fn ifloatln(&mut self, value: f64, unit: Option<&str>) -> &mut Self {
        let old = self
            .cursor
            .peek_token()
            .and_then(|t| t.text().parse::<f64>().ok());
        let postfix = unit.map(|u| format!(" {u}")).unwrap_or_default();
        self.i(&format!("{value:.3}{postfix}"));
        match old {
            Some(old) => self.iln(&format!(" (was {old:.3}{postfix})")),
            None => self.iln(""),
        }
    }

    /// Time `f`, failing the line when it takes longer than `max_ms`.
    pub fn tmsln<R>(&mut self, f: impl FnOnce() -> R, max_ms: f64) -> R {
        let start = self.clock.now_millis();
        let result = f();
        let ms = self.clock.elapsed_since(start).as_millis() as f64;
        if ms > max_ms {
            self.fail()
                .tln(&format!("{ms:.2} ms > max {max_ms:.2} ms! (failed)"));
        } else {
            self.ifloatln(ms, Some("ms"));
        }
        result
    }

    /// Time `f` without a budget.
    pub fn imsln<R>(&mut self, f: impl FnOnce() -> R) -> R {
        self.tmsln(f, f64::INFINITY)
    }

    /// Tested line with the type skeleton of a JSON value.
    pub fn tformat(&mut self, value: &Value) -> &mut Self {
        let shape = value_format(value);
        self.tln(&format!("{shape:#}"))
    }

    /// Record an error raised by the case body.
    pub fn record_error(&mut self, message: &str) -> &mut Self {
        self.iln("")
            .fail()
            .iln(&format!("case raised an error: {message}"))
    }

    // -- files -------------------------------------------------------------

    /// Path of a scratch file, deleted before the next run of the case.
    pub fn tmp_path(&self, name: &str) -> std::io::Result<PathBuf> {
        let dir = self.layout.tmp_dir(&self.path);
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(name))
    }

    pub fn tmp_dir(&self, name: &str) -> std::io::Result<PathBuf> {
        let dir = self.tmp_path(name)?;
        std::fs::create_dir(&dir)?;
        Ok(dir)
    }

    /// Path of an asset file that is promoted with the baseline on freeze.
    pub fn file(&self, name: &str) -> std::io::Result<PathBuf> {
        let dir = self.layout.output_assets(&self.path);
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(name))
    }

    /// Rename `file` to the SHA-256 of its content plus `postfix`.
    pub fn rename_file_to_hash(&self, file: &Path, postfix: &str) -> std::io::Result<PathBuf> {
        let mut hasher = Sha256::new();
        let mut reader = std::fs::File::open(file)?;
        std::io::copy(&mut reader, &mut hasher)?;
        let name = format!("{}{postfix}", hex::encode(hasher.finalize()));
        let renamed = file.with_file_name(name);
        std::fs::rename(file, &renamed)?;
        Ok(renamed)
    }

    /// Path of `file` relative to the directory holding the case output,
    /// usable as a link from the output markdown.
    pub fn rel_path(&self, file: &Path) -> Option<PathBuf> {
        let output = self.layout.output_file(&self.path);
        let base = output.parent()?;
        file.strip_prefix(base).ok().map(Path::to_path_buf)
    }

    // -- finish ------------------------------------------------------------

    /// Commit any pending line, write the output and review report, and
    /// compute the verdict.
    pub fn finish(mut self) -> std::io::Result<CaseOutcome> {
        if !self.out_line.is_empty() || self.line_diff.is_some() || self.line_error.is_some() {
            self.commit_line();
        }

        let baseline_existed = self.cursor.exists();
        let verdict = Verdict::from_counts(self.errors, self.diffs, baseline_existed);

        let output_file = self.layout.output_file(&self.path);
        if let Some(parent) = output_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&output_file, &self.output)?;
        std::fs::write(self.layout.report_file(&self.path), &self.report)?;

        Ok(CaseOutcome {
            verdict,
            diffs: self.diffs,
            errors: self.errors,
            marks: self.marks,
            output: self.output,
            report: self.report,
            baseline_existed,
        })
    }
}

/// Assertions about one value, printed as ` * MUST ...` lines.
pub struct Subject<'a, T> {
    ctx: &'a mut CaseContext,
    title: String,
    it: T,
}

impl<'a, T> Subject<'a, T> {
    pub fn value(&self) -> &T {
        &self.it
    }

    pub fn must_apply(mut self, title: &str, cond: impl FnOnce(&T) -> bool) -> Self {
        let ok = cond(&self.it);
        self.ctx.must_line(title, ok, None);
        self
    }

    pub fn must_equal<V>(mut self, value: V) -> Self
    where
        T: PartialEq<V>,
        V: Display,
    {
        let ok = self.it == value;
        self.ctx.must_line(&format!("equal {value}"), ok, None);
        self
    }

    pub fn must_contain<M>(mut self, member: M) -> Self
    where
        M: PartialEq + Display,
        for<'x> &'x T: IntoIterator<Item = &'x M>,
    {
        let ok = (&self.it).into_iter().any(|m| *m == member);
        self.ctx.must_line(&format!("have {member}"), ok, None);
        self
    }

    /// Continue with assertions about a part of the value.
    pub fn member<U>(mut self, title: &str, select: impl FnOnce(&T) -> U) -> Subject<'a, U> {
        let it = select(&self.it);
        let title = format!("{}.{title}", self.title);
        self.ctx.h2(&format!("{title}.."));
        Subject {
            ctx: self.ctx,
            title,
            it,
        }
    }
}

fn common_prefix_chars(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Replace every leaf of a JSON value with the name of its type.
pub fn value_format(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(value_format).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), value_format(item)))
                .collect(),
        ),
        Value::Null => Value::from("null"),
        Value::Bool(_) => Value::from("boolean"),
        Value::Number(_) => Value::from("number"),
        Value::String(_) => Value::from("string"),
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
