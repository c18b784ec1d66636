//! Logging utilities shared by every crate in the workspace.
//!
//! Call [`init`] once at process start. Log levels are controlled through
//! `RUST_LOG`; the `callback` prefix is raised to the requested level so
//! the agent's own output is visible without drowning in dependency noise.

use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at the default level (INFO).
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// Uses `try_init` so a second call (tests, supervised re-entry) is a
/// no-op instead of a panic.
pub fn init_with_level(level: Level) {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("callback={}", level).parse().unwrap());

    let result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}
