//! Diagnostic logging.
//!
//! Logs go to stderr through `tracing-subscriber`, so stdout carries only
//! command output. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "warn,textbook_companion=info,tbc=info";

/// Install the global subscriber. `verbose` raises this crate to `debug`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,textbook_companion=debug,tbc=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    // Ignore a second initialization (tests, embedding binaries).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
