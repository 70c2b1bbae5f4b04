//! Tracing setup
//!
//! Plain structured logging with an environment filter. JSON output for
//! anything that scrapes logs, human-readable otherwise.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subsystem.
///
/// Log levels come from `RUST_LOG`; without it, crucible crates log at
/// debug and everything else at info. Safe to call once per process;
/// later calls are ignored.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,crucible=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    // A subscriber installed by the host process wins.
    drop(result);
}
