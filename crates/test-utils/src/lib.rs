//! Shared fixtures for dib2cloud integration tests.
//!
//! - [`builders`]: temp-dir rooted configs and diskimages.
//! - [`fake_tool`]: a scripted `disk-image-create`.
//! - [`fake_cloud`]: an in-memory [`dib2cloud::cloud::CloudClient`].

pub mod builders;
pub mod fake_cloud;
pub mod fake_tool;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Route tracing into the test harness's captured output.
///
/// Reads the same `DIB2CLOUD_LOG` directive the binary does; defaults to
/// debug for the crate itself so failing tests show job lifecycle events.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(dib2cloud::logging::LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("warn,dib2cloud=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    with_deadline(TEST_TIMEOUT, f).await
}

/// Await `f`, panicking after `limit`.
pub async fn with_deadline<F, T>(limit: Duration, f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step did not finish within {limit:?}"),
    }
}
