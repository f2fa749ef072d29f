// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Build scripts are expected to panic on failure.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::Write;

fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let path = std::path::Path::new(&out_dir).join("env_names.rs");
    let mut f = std::fs::File::create(path).unwrap();

    let vars = [
        ("SNAPBOOK_BOOKS_DIR", "SNAPBOOK_BOOKS_DIR"),
        ("SNAPBOOK_OUT_DIR", "SNAPBOOK_OUT_DIR"),
        ("SNAPBOOK_DEFAULT_SELECTION", "SNAPBOOK_DEFAULT_SELECTION"),
        ("SNAPBOOK_PARALLEL", "SNAPBOOK_PARALLEL"),
        ("SNAPBOOK_WORKERS", "SNAPBOOK_WORKERS"),
        ("SNAPBOOK_FAIL_FAST", "SNAPBOOK_FAIL_FAST"),
        ("SNAPBOOK_CONTINUE_RUN", "SNAPBOOK_CONTINUE_RUN"),
        (
            "SNAPBOOK_REFRESH_DEPENDENCIES",
            "SNAPBOOK_REFRESH_DEPENDENCIES",
        ),
        ("SNAPBOOK_ACCEPT", "SNAPBOOK_ACCEPT"),
        ("SNAPBOOK_UPDATE", "SNAPBOOK_UPDATE"),
        ("SNAPBOOK_VERBOSE", "SNAPBOOK_VERBOSE"),
        ("SNAPBOOK_POINT_ERROR_POS", "SNAPBOOK_POINT_ERROR_POS"),
        ("SNAPBOOK_TIMEOUT_MS", "SNAPBOOK_TIMEOUT_MS"),
        ("SNAPBOOK_POLL_MS", "SNAPBOOK_POLL_MS"),
        ("SNAPBOOK_LOG", "SNAPBOOK_LOG"),
    ];

    for (const_name, env_name) in vars {
        writeln!(f, "pub const {const_name}: &str = \"{env_name}\";").unwrap();
    }
}
