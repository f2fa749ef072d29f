// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-run case reports.
//!
//! This crate records the verdict and duration of every case executed in a
//! run. Entries are appended one JSON line at a time and flushed as soon as
//! they are written, so an interrupted run leaves a readable log that a later
//! run can continue from.

mod duration_serde;
mod entry;
mod error;
mod log;
mod metrics;
mod reports;
mod verdict;

pub use entry::CaseEntry;
pub use error::ReportError;
pub use log::ReportLog;
pub use metrics::RunMetrics;
pub use reports::{CaseReports, ContinuePlan, Summary};
pub use verdict::Verdict;
