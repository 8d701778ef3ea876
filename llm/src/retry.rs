//! Retry/backoff wrapper.
//!
//! Classifies failures by message-marker matching rather than HTTP status
//! codes, since the transport itself is external. Callers pick the base
//! delay per stage (30s for explore, 15s for synthesize).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::contract::{InvokeConfig, InvokeError, InvokeOutcome, LlmClient};

/// Substrings that mark an error message as transient.
const TRANSIENT_MARKERS: &[&str] = &[
    "rate limit",
    "Too Many Requests",
    "Response failed",
    "network error",
    "timed out",
    "ETIMEDOUT",
    "ECONNRESET",
];

/// Classify an error as transient (retryable) vs. fatal.
///
/// An error is transient iff its model-layer status is 429, or its message
/// matches any of [`TRANSIENT_MARKERS`].
#[must_use]
pub fn is_transient(error: &InvokeError) -> bool {
    match error {
        InvokeError::ModelError { status, message } => {
            *status == Some(429) || TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
        }
        InvokeError::Generic(message) => TRANSIENT_MARKERS.iter().any(|m| message.contains(m)),
        InvokeError::BudgetExceeded(_) | InvokeError::OutputParseError { .. } => false,
    }
}

/// Exponential backoff delay for retry attempt `attempt` (1-indexed: the
/// delay awaited *before* attempt `attempt + 1`), `base * 2^(attempt-1)`.
#[must_use]
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    base.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX))
}

/// Retry a transient-failing async operation up to `max_attempts` times
/// total, backing off `base` between attempts. Non-transient errors
/// propagate immediately without consuming a retry.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    base: Duration,
    mut operation: F,
) -> Result<T, InvokeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, InvokeError>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && is_transient(&error) => {
                let delay = backoff_delay(base, attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    error = %error,
                    "transient invocation error, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Wraps an [`LlmClient`] with the transient-retry policy, so a call site
/// that needs "invoke, retrying transient failures" can hand this to
/// anything that already expects a plain `&dyn LlmClient` — notably the
/// file-presence wrapper, which composes with this by invoking through a
/// `RetryingClient` rather than retrying itself. Schema and codegen are
/// wrapped by the file-presence retry, and separately subject to the same
/// transient-recovery policy as every other stage.
pub struct RetryingClient<'a> {
    inner: &'a dyn LlmClient,
    max_attempts: u32,
    base: Duration,
}

impl<'a> RetryingClient<'a> {
    #[must_use]
    pub fn new(inner: &'a dyn LlmClient, max_attempts: u32, base: Duration) -> Self {
        Self {
            inner,
            max_attempts,
            base,
        }
    }
}

#[async_trait]
impl LlmClient for RetryingClient<'_> {
    async fn invoke(&self, prompt: &str, config: &InvokeConfig) -> Result<InvokeOutcome, InvokeError> {
        retry_with_backoff(self.max_attempts, self.base, |_attempt| {
            self.inner.invoke(prompt, config)
        })
        .await
    }
}
