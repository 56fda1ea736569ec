//! Logging setup for the CLI binary.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Initialize tracing output to stderr. `RUST_LOG` overrides the level
/// chosen by `--verbose`.
pub fn init(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
