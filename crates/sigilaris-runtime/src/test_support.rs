//! Shared `#[cfg(test)]` helpers for this crate's test modules.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing_subscriber` fmt layer routed through the test
/// harness's captured output, so a failing test's `tracing::trace!`/`debug!`
/// call sites show up in `cargo test` output without needing `--nocapture`.
/// Idempotent — safe to call at the top of every test.
pub(crate) fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .ok();
    });
}
