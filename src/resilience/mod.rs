//! 弹性模式模块：指数退避重试。
//!
//! # Resilience Module
//!
//! Bounded exponential-backoff retry for flaky network calls.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`RetryPolicy`] | attempts, initial/max delay, multiplier |
//! | [`retry`] | run an async operation under a policy and a retry predicate |
//! | [`retry_with_cancel`] | same, stopping early on a [`tokio_util::sync::CancellationToken`] |
//!
//! ```rust
//! use mcp_assistant::resilience::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(10), 2.0);
//! assert_eq!(policy.delays(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
//! ```

pub mod retry;

pub use retry::{retry, retry_with_cancel, retry_with_sleep, RetryError, RetryPolicy};
