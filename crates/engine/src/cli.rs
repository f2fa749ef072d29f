// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line front end for test binaries.
//!
//! A test binary registers its cases and hands the registry to [`run`]:
//!
//! ```no_run
//! use clap::Parser;
//! use snapbook::case::CaseRegistry;
//! use snapbook::cli::{self, Cli};
//!
//! let registry = CaseRegistry::new();
//! std::process::exit(cli::run(registry, Cli::parse()));
//! ```

use clap::Parser;
use snapbook_report::{CaseReports, RunMetrics, Summary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::case::CaseRegistry;
use crate::config::Config;
use crate::error::EngineError;
use crate::exit;
use crate::output::{print_error, RunPrinter};
use crate::scheduler::{AbortHandle, Scheduler};
use crate::selection::Selection;

/// Snapshot test runner
#[derive(Parser, Clone, Debug, Default)]
#[command(name = "snapbook", version, about = "Snapshot test runner")]
pub struct Cli {
    /// Cases to run: `*`, path prefixes, or `skip:prefix`
    #[arg(value_name = "SELECTION")]
    pub selection: Vec<String>,

    /// Run cases concurrently
    #[arg(short = 'p', long)]
    pub parallel: bool,

    /// Stop after the first differing or failing case
    #[arg(short = 'f', long)]
    pub fail_fast: bool,

    /// Skip cases that passed in the previous run
    #[arg(short = 'c', long = "continue")]
    pub continue_run: bool,

    /// Re-run dependencies even when cached results exist
    #[arg(short = 'r', long)]
    pub refresh_dependencies: bool,

    /// Accept differing output as the new baseline
    #[arg(short = 'a', long)]
    pub accept: bool,

    /// Refresh baselines of passing cases
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Print the review report of differing and failing cases
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Mark the first mismatching column in review reports
    #[arg(long)]
    pub point_error_pos: bool,

    /// Worker limit for concurrent runs
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-case wall-clock budget in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Project root holding `snapbook.toml` and the books
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// List the cases the selection would run
    #[arg(short = 'l', long, conflicts_with_all = ["review", "path"])]
    pub list: bool,

    /// Print the results of the previous run
    #[arg(long, conflicts_with = "path")]
    pub review: bool,

    /// Print the baseline file of each selected case
    #[arg(long)]
    pub path: bool,
}

impl Cli {
    pub fn root(&self) -> &Path {
        self.root.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Apply command-line overrides on top of a loaded config.
    ///
    /// Flags only switch options on; an unset flag keeps the configured value.
    pub fn apply(&self, config: &mut Config) {
        let flags = [
            (self.parallel, &mut config.parallel),
            (self.fail_fast, &mut config.fail_fast),
            (self.continue_run, &mut config.continue_run),
            (self.refresh_dependencies, &mut config.refresh_dependencies),
            (self.accept, &mut config.accept),
            (self.update, &mut config.update),
            (self.verbose, &mut config.verbose),
            (self.point_error_pos, &mut config.point_error_pos),
        ];
        for (set, field) in flags {
            if set {
                *field = true;
            }
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = Some(timeout_ms);
        }
    }

    /// Positional selection, or the configured default.
    pub fn selection(&self, config: &Config) -> Selection {
        if self.selection.is_empty() {
            Selection::new(config.default_selection.iter().cloned())
        } else {
            Selection::new(self.selection.iter().cloned())
        }
    }

    /// Config file, then environment, then these flags.
    pub fn resolve_config(&self) -> Result<Config, EngineError> {
        let mut config = Config::load(self.root())?;
        self.apply(&mut config);
        Ok(config)
    }
}

/// Run the command described by `cli` and return the process exit code.
///
/// SIGINT requests a cooperative abort: running cases finish and their
/// results are recorded. Cases still running past their timeout are
/// abandoned when the run ends.
pub fn run(registry: CaseRegistry, cli: Cli) -> i32 {
    let abort = AbortHandle::new();
    #[cfg(unix)]
    {
        if let Err(e) = signal_hook::flag::register(signal_hook::consts::SIGINT, abort.flag()) {
            tracing::warn!(error = %e, "failed to install SIGINT handler");
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            print_error(format_args!("failed to start runtime: {e}"));
            return exit::ERROR;
        }
    };

    let printer = RunPrinter::stdout();
    let result = runtime.block_on(execute(registry, &cli, printer, abort));
    // Timed-out cases may still occupy blocking threads; do not wait for them.
    runtime.shutdown_background();
    match result {
        Ok(code) => code,
        Err(e) => {
            print_error(&e);
            exit::ERROR
        }
    }
}

/// Asynchronous body of [`run`], with injectable output and abort flag.
pub async fn execute(
    registry: CaseRegistry,
    cli: &Cli,
    printer: RunPrinter,
    abort: AbortHandle,
) -> Result<i32, EngineError> {
    let config = cli.resolve_config()?;
    let layout = config.layout(cli.root());
    let selection = cli.selection(&config);

    if cli.review {
        return review(&layout, &printer);
    }

    let scheduler =
        Scheduler::new(Arc::new(registry), layout, config.clone())?.with_abort(abort);

    if cli.list || cli.path {
        let order = scheduler
            .graph()
            .resolve_order(&selection, config.refresh_dependencies);
        for case in order {
            if cli.path {
                printer.line(&scheduler.layout().baseline_file(&case).display().to_string());
            } else {
                printer.line(&case);
            }
        }
        return Ok(exit::SUCCESS);
    }

    let mut scheduler = scheduler.with_printer(printer);
    let summary = scheduler.run(&selection).await?;
    Ok(summary.exit_code())
}

/// Print the results recorded by the previous run.
fn review(layout: &crate::layout::BookLayout, printer: &RunPrinter) -> Result<i32, EngineError> {
    let reports = CaseReports::read(&layout.cases_file())?;
    let took = RunMetrics::of_dir(layout.out_dir())?
        .map(|metrics| Duration::from_millis(metrics.took_ms))
        .unwrap_or_default();

    printer.start_report();
    for entry in reports.entries() {
        printer.case_result(&entry.path, entry.verdict, entry.duration, None);
    }
    let summary: Summary = reports.summary();
    let failed: Vec<String> = reports.failed().into_iter().map(String::from).collect();
    printer.end_report(&summary, &failed, took);
    Ok(exit::for_summary(&summary, false))
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
