// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot-driven test engine.
//!
//! Cases write markdown-like output through a [`context::CaseContext`],
//! which compares it token by token against the accepted baseline and
//! yields an OK, DIFF or FAIL verdict. The [`scheduler::Scheduler`] runs
//! cases in dependency order, sequentially or on a worker pool, caching
//! return values for dependent cases and recording every verdict in an
//! append-only report.
//!
//! ```no_run
//! use snapbook::case::{Callable, Case, CaseRegistry};
//! use snapbook::cli::{self, Cli};
//! use clap::Parser;
//!
//! let greet = Callable::new(|ctx, _| {
//!     ctx.h1("Greeting");
//!     ctx.keyvalueln("message:", "hello");
//!     Ok(None)
//! });
//! let mut registry = CaseRegistry::new();
//! registry.register(Case::new("examples/greet", &greet)).unwrap();
//! std::process::exit(cli::run(registry, Cli::parse()));
//! ```

pub mod cache;
pub mod case;
pub mod cli;
pub mod config;
pub mod context;
pub mod demo;
pub mod env;
pub mod error;
pub mod exit;
pub mod graph;
pub mod layout;
pub mod output;
pub mod pool;
pub mod review;
pub mod scheduler;
pub mod selection;
pub mod snapshot;
pub mod time;
pub mod token;
pub mod wrapper;

pub use snapbook_report as report;
