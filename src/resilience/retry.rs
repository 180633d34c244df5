//! Bounded exponential-backoff retry around a single fallible async operation.
//!
//! The loop is strictly sequential: an attempt never starts before the
//! previous one and its delay have finished.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Parameters governing retry behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of executions, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// Profile for tool-augmented calls: they are slow and expensive, so fewer
    /// attempts with longer spacing.
    pub fn for_tool_calls() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// Delay that follows `current`: `min(current * multiplier, max_delay)`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// The full delay schedule between attempts (`max_attempts - 1` entries).
    pub fn delays(&self) -> Vec<Duration> {
        let count = self.max_attempts.saturating_sub(1) as usize;
        let mut out = Vec::with_capacity(count);
        let mut delay = self.initial_delay;
        for _ in 0..count {
            out.push(delay);
            delay = self.next_delay(delay);
        }
        out
    }
}

/// Failure of [`retry_with_cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The last attempt failed (retries exhausted or not retryable).
    Failed(E),
    /// The token was cancelled during an attempt or a delay.
    Cancelled,
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Failed(e) => Some(e),
            RetryError::Cancelled => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Failed(e) => write!(f, "{}", e),
            RetryError::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Run `operation` under `policy`, sleeping with `tokio::time::sleep`.
///
/// After a failure, the error is returned immediately when it came from the
/// last allowed attempt or when `should_retry` rejects it.
pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    should_retry: P,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    retry_with_sleep(policy, should_retry, operation, tokio::time::sleep).await
}

/// Same as [`retry`] with an injectable sleep function.
pub async fn retry_with_sleep<T, E, F, Fut, P, S, SFut>(
    policy: &RetryPolicy,
    should_retry: P,
    mut operation: F,
    mut sleep: S,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= max_attempts {
            debug!(attempt, max_attempts, error = %err, "retries exhausted");
            return Err(err);
        }
        if !should_retry(&err) {
            debug!(attempt, error = %err, "failure is not retryable");
            return Err(err);
        }

        warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed; retrying"
        );
        sleep(delay).await;
        delay = policy.next_delay(delay);
        attempt += 1;
    }
}

/// [`retry`] that also stops when `cancel` fires.
///
/// Cancellation is observed both while an attempt is in flight (the attempt's
/// future is dropped) and while waiting between attempts.
pub async fn retry_with_cancel<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    should_retry: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let attempt = || {
        let fut = if cancel.is_cancelled() {
            None
        } else {
            Some(operation())
        };
        async move {
            match fut {
                None => Err(RetryError::Cancelled),
                Some(fut) => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(RetryError::Cancelled),
                    res = fut => res.map_err(RetryError::Failed),
                },
            }
        }
    };

    let sleep = |delay: Duration| async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    };

    let predicate = |err: &RetryError<E>| match err {
        RetryError::Failed(e) => should_retry(e),
        RetryError::Cancelled => false,
    };

    retry_with_sleep(policy, predicate, attempt, sleep).await
}
