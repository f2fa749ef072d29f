// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Process exit codes.

use snapbook_report::Summary;

/// Every case passed
pub const SUCCESS: i32 = 0;
/// At least one case differed or failed
pub const FAILURE: i32 = 1;
/// The run could not complete (configuration, corrupt state, I/O)
pub const ERROR: i32 = 2;
/// Interrupted by signal (Ctrl+C)
pub const INTERRUPTED: i32 = 130;

/// Exit code for a completed run.
pub fn for_summary(summary: &Summary, interrupted: bool) -> i32 {
    if interrupted {
        INTERRUPTED
    } else if summary.is_success() {
        SUCCESS
    } else {
        FAILURE
    }
}
