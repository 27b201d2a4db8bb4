//! Diagnostic tracing for gitai.
//!
//! Operator-facing text (model replies, questions) goes through
//! [`crate::io::operator`] on stdout. This module only configures the
//! diagnostics written to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output goes to stderr in compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=gitai=debug gitai commit --use-commit-body
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
