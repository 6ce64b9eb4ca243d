//! Diagnostic tracing via `RUST_LOG`, written to stderr.
//!
//! Trial rejections inside the engine log at `debug`, commits at `info`.
//! Command output (scaffolds, tables, dependency lists) goes to stdout and is
//! unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=verbfuzz=debug verbfuzz mutate scaffold.json --rounds 4
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
