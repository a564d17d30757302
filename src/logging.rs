//! Logging setup for the command-line tools.
//!
//! The library only emits `tracing` events; binaries call [`init`] once at
//! startup. `RUST_LOG` overrides the default level:
//!
//! ```bash
//! RUST_LOG=debug hive_extractor image.raw
//! RUST_LOG=dfxml_tools::extract=trace hive_extractor image.raw
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a stderr subscriber. Defaults to `info`, or `debug` when
/// `verbose` is set.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .compact(),
    );

    // Already set when called twice
    let _ = tracing::subscriber::set_global_default(subscriber);
}
