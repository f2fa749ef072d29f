// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! snapbook binary entry point: runs the built-in demo book.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use snapbook::cli::{self, Cli};
use snapbook::output::print_error;
use snapbook::{demo, env, exit};

fn main() {
    let filter = env::log_filter()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = match demo::registry() {
        Ok(registry) => registry,
        Err(e) => {
            print_error(e);
            std::process::exit(exit::ERROR);
        }
    };
    std::process::exit(cli::run(registry, cli));
}
