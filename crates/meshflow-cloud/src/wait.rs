//! Bounded waiting with exponential backoff
//!
//! Cross-region peering and instance launches are eventually consistent:
//! the create call returns before the resource is usable. `wait_until`
//! polls a check closure under a `WaitConfig` budget and fails with
//! `DependencyNotReady` when the budget runs out, so a stuck dependency
//! surfaces as a typed, retryable error instead of a hang.

use std::future::Future;
use std::time::Duration;

use meshflow_core::WaitConfig;
use tracing::debug;

use crate::error::{CloudError, Result};

/// Poll `check` until it yields a value or the wait budget is exhausted.
///
/// `check` returns `Ok(Some(value))` when the awaited condition holds,
/// `Ok(None)` to keep waiting, or `Err` to abort immediately (provider
/// rejections are not retried here). `what` names the awaited condition
/// in logs and in the resulting `DependencyNotReady`.
pub async fn wait_until<F, Fut, T>(what: &str, config: &WaitConfig, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut waited_ms: u64 = 0;
    for attempt in 0..config.max_retries {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        if attempt < config.max_retries - 1 {
            let delay = config.delay_for_attempt(attempt);
            debug!(
                what,
                attempt = attempt + 1,
                max = config.max_retries,
                delay_ms = delay,
                "not ready, backing off"
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
            waited_ms += delay;
        }
    }
    Err(CloudError::DependencyNotReady {
        what: what.to_string(),
        attempts: config.max_retries,
        waited_ms,
    })
}
