// SPDX-License-Identifier: Apache-2.0

//! Bounded retry for catalog round-trips
//!
//! Attempts run sequentially with a fixed delay between them. The delay is
//! awaited by the calling task; nothing is spawned.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::metrics;

/// Runs `operation` up to `max_attempts` times.
///
/// Stops early with the failing error as soon as `is_retryable` rejects it.
/// When every attempt fails the last error is returned. A `max_attempts` of
/// zero behaves like one.
pub async fn retry<T, E, F, Fut, P>(
    mut operation: F,
    max_attempts: u32,
    is_retryable: P,
    delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= max_attempts {
                    error!(attempt, max_attempts, error = %err, "Operation failed, giving up");
                    return Err(err);
                }

                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, will retry"
                );
                metrics::record_retry();
                tokio::time::sleep(delay).await;

                attempt += 1;
                info!(attempt, max_attempts, "Retrying operation");
            }
        }
    }
}

/// Retry settings applied to every catalog query an extractor issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_DELAY_MS: u64 = 1000;

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// Single attempt, no delay
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Retries transient engine failures only.
    pub async fn run<T, F, Fut>(&self, operation: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        retry(
            operation,
            self.max_attempts,
            EngineError::is_transient,
            self.delay(),
        )
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            delay_ms: Self::DEFAULT_DELAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<EngineResult<&'static str>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                std::future::ready(Err(EngineError::connection_failed("connection reset")))
            } else {
                std::future::ready(Ok("done"))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_failures_with_two_delays() {
        let calls = Arc::new(AtomicU32::new(0));
        let delay = Duration::from_millis(1000);
        let start = Instant::now();

        let result = retry(flaky(2, calls.clone()), 3, EngineError::is_transient, delay).await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), delay * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts_with_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(50));

        let result = policy.run(flaky(10, calls.clone())).await;

        assert!(matches!(result, Err(EngineError::ConnectionFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let start = Instant::now();

        let result: EngineResult<()> = RetryPolicy::default()
            .run(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(EngineError::table_not_found("ds", "app", "gone")))
            })
            .await;

        assert!(matches!(result, Err(EngineError::TableNotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry(flaky(0, calls.clone()), 0, |_: &EngineError| true, Duration::ZERO).await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
