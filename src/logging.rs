//! Logging setup
//!
//! Log lines go to stderr through `tracing-subscriber`. `RUST_LOG` takes
//! precedence; otherwise the `--debug` flag picks between info and debug.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "babybutton=debug"
    } else {
        "babybutton=info"
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
