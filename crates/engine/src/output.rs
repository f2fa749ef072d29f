// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Console output for a run.
//!
//! Each case is printed as one complete line so concurrent completions
//! never interleave.

use parking_lot::Mutex;
use snapbook_report::{Summary, Verdict};
use std::io::{IsTerminal, Write};
use std::time::Duration;
use tracing::warn;

pub struct RunPrinter {
    out: Mutex<Box<dyn Write + Send>>,
    verbose: bool,
}

impl RunPrinter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            verbose: false,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Discard everything.
    pub fn sink() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Print the review report of differing and failing cases.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn start_report(&self) {
        self.emit("\n# test results:\n\n");
    }

    pub fn case_result(&self, path: &str, verdict: Verdict, duration: Duration, report: Option<&str>) {
        let ms = duration.as_millis();
        let mut text = match verdict {
            Verdict::Ok => format!("  {path} - {ms} ms\n"),
            Verdict::Diff => format!("  {path} - DIFFERED in {ms} ms\n"),
            Verdict::Fail => format!("  {path} - FAILED in {ms} ms\n"),
        };
        if self.verbose && !verdict.is_ok() {
            if let Some(report) = report {
                text.push('\n');
                for line in report.lines() {
                    text.push_str("    ");
                    text.push_str(line);
                    text.push('\n');
                }
                text.push('\n');
            }
        }
        self.emit(&text);
    }

    pub fn end_report(&self, summary: &Summary, failed: &[String], took: Duration) {
        let ms = took.as_millis();
        let mut text = String::from("\n");
        if summary.is_success() {
            text.push_str(&format!(
                "{total}/{total} test succeeded in {ms} ms\n",
                total = summary.total
            ));
        } else {
            text.push_str(&format!(
                "{}/{} test {} differed and {} failed in {ms} ms:\n\n",
                summary.failed(),
                summary.total,
                summary.diff,
                summary.fail
            ));
            for path in failed {
                text.push_str(&format!("  {path}\n"));
            }
        }
        self.emit(&text);
    }

    pub fn line(&self, text: &str) {
        self.emit(&format!("{text}\n"));
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            warn!(error = %e, "failed to write console output");
        }
    }
}

/// Print a fatal error to stderr, in red on a terminal.
pub fn print_error(msg: impl std::fmt::Display) {
    let is_tty = std::io::stderr().is_terminal();
    write_error(&mut std::io::stderr(), msg, is_tty);
}

fn write_error<W: Write>(writer: &mut W, msg: impl std::fmt::Display, is_terminal: bool) {
    let _ = if is_terminal {
        writeln!(writer, "\x1b[31merror: {msg}\x1b[0m")
    } else {
        writeln!(writer, "error: {msg}")
    };
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
