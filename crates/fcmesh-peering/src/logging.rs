//! Tracing subscriber configuration for processes embedding the
//! controller.
//!
//! The peering layer logs under the `fcmesh_peering` target: peer
//! lifecycle at INFO (added, relocated, removed), dropped wire input
//! and ping decisions at DEBUG, per-frame data path activity at TRACE.

use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset: peer lifecycle from the
/// peering layer, warnings from everything else.
const DEFAULT_DIRECTIVES: &str = "warn,fcmesh_peering=info";

/// Directives for test runs: drop and ping decisions included, which
/// is what a failing liveness or demux test needs to show.
const TEST_DIRECTIVES: &str = "fcmesh_peering=debug,fcmesh_core=debug";

/// Initialize the tracing subscriber for an embedding binary.
///
/// `RUST_LOG` overrides [`DEFAULT_DIRECTIVES`].
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(TEST_DIRECTIVES));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
