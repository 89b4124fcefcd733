//! Tracing subscriber setup.
//!
//! Logging is opt-in for library consumers. Call [`init`] once at startup to
//! get formatted output filtered by `RUST_LOG`, or install your own
//! subscriber and skip this module entirely.

use tracing_subscriber::EnvFilter;

/// Initializes a formatted subscriber with an `info` default level.
///
/// `RUST_LOG` overrides the default (e.g. `RUST_LOG=aeronox=debug`).
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    init_with_default("info");
}

/// Initializes the subscriber with a custom default filter directive.
pub fn init_with_default(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init();
        init_with_default("debug");
    }
}
