//! Logging setup for the binary
//!
//! Logs go to stderr so that `--format json` output stays parseable.

use tracing_subscriber::EnvFilter;

const CRATES: [&str; 6] = [
    "hubcat",
    "hubcat_cli",
    "hubcat_core",
    "hubcat_pipeline",
    "hubcat_sqlite",
    "hubcat_query",
];

/// Default directives: every hubcat crate at `info`, or `debug` when verbose
pub fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
