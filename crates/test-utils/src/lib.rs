//! Shared helpers for keep-testing's integration tests.

pub mod builders;
pub mod fakes;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing for tests, once per test binary.
///
/// Output goes through `with_test_writer()`, so the harness only shows it for
/// failing tests (or with `-- --nocapture`). The filter comes from `RUST_LOG`,
/// then `KEEP_TESTING_LOG`, then defaults to `info`:
/// `KEEP_TESTING_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_from_env("KEEP_TESTING_LOG"))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_names(true)
            .init();
    });
}

/// Fail the test if `f` takes longer than five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .expect("Test timed out after 5 seconds")
}
