//! Tracing setup for the binary and for tests.
//!
//! Events go to stderr so they never interleave with the interactive shell on
//! stdout. `--log-file` adds a JSON copy of the same events.

use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. `RUST_LOG`, when set, replaces the filter
/// derived from `-v`/`--quiet`.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log file cannot be
/// created, or a subscriber is already installed.
pub fn init_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbosity, quiet)))
        .context("invalid log filter")?;

    let json = log_file
        .map(|path| {
            File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))
                .map(|file| fmt::layer().json().with_writer(Mutex::new(file)))
        })
        .transpose()?;

    let stderr = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(verbosity > 1);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(json)
        .try_init()
        .context("logging already initialized")
}

fn default_filter(verbosity: u8, quiet: bool) -> &'static str {
    match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "todoika=warn",
        (false, 1) => "todoika=info",
        (false, 2) => "todoika=debug,sqlx=info",
        (false, _) => "todoika=trace,sqlx=debug,rusqlite=debug",
    }
}

/// Route events to the test harness's captured output. Safe to call from
/// every test.
pub fn init_test_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("todoika=debug,test=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}
