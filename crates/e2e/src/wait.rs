//! Bounded condition polling
//!
//! Fixed sleeps before asserts are a flakiness source; poll a predicate
//! with a deadline instead and surface the timeout as an error.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
#[error("condition not met within {timeout:?}")]
pub struct WaitTimeout {
    pub timeout: Duration,
}

/// Poll `probe` until it returns true or `timeout` elapses.
pub async fn wait_until<F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<(), WaitTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(WaitTimeout { timeout });
        }
        tokio::time::sleep(interval.min(deadline - Instant::now())).await;
    }
}
