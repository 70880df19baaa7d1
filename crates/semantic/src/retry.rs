//! Retry logic with exponential backoff.
//!
//! Used for HTTP embedding calls and, by the matcher, to space out repeated
//! model-initialization attempts after a failure.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries (base for exponential backoff) in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Maximum delay between retries in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Add random jitter to prevent thundering herd.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate delay for a specific retry attempt (0-indexed, attempt 0 never waits).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        // base_delay * multiplier^(attempt-1), capped at max_delay
        let exponential = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        // +/-25% jitter
        if self.jitter {
            let jitter_range = delay_ms / 4;
            if jitter_range > 0 {
                let jitter = fastrand::u64(0..jitter_range * 2);
                return Duration::from_millis(delay_ms - jitter_range + jitter);
            }
        }

        Duration::from_millis(delay_ms)
    }
}

/// Result of a retryable operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T> {
    /// The final result (success or last error).
    pub result: Result<T, String>,
    /// Number of attempts made (1 = first try succeeded).
    pub attempts: u32,
    /// Total time spent retrying.
    pub total_duration: Duration,
    /// Whether the operation ultimately succeeded.
    pub succeeded: bool,
}

impl<T> RetryResult<T> {
    pub fn into_result(self) -> Result<T, String> {
        self.result
    }
}

/// Determine if an error is retryable based on its message.
pub fn is_retryable_error(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    if error_lower.contains("timeout")
        || error_lower.contains("connection")
        || error_lower.contains("reset")
        || error_lower.contains("refused")
        || error_lower.contains("dns")
        || error_lower.contains("unreachable")
    {
        return true;
    }

    if error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("504")
        || error_lower.contains("429")
        || error_lower.contains("500")
        || error_lower.contains("524")
    {
        return true;
    }

    if error_lower.contains("400")
        || error_lower.contains("401")
        || error_lower.contains("403")
        || error_lower.contains("404")
        || error_lower.contains("422")
    {
        return false;
    }

    true
}

/// Execute an async function with retry logic.
///
/// The operation receives the 0-indexed attempt number. Returning an error whose
/// message is not retryable (see [`is_retryable_error`]) stops early.
///
/// # Example
/// ```
/// use semantic::retry::{RetryConfig, execute_with_retry_async};
/// use std::time::Duration;
///
/// async fn example() {
///     let config = RetryConfig::default()
///         .with_max_retries(3)
///         .with_base_delay(Duration::from_millis(100));
///
///     let result = execute_with_retry_async(&config, |attempt| async move {
///         if attempt == 0 {
///             Err("transient error".to_string())
///         } else {
///             Ok("success")
///         }
///     }).await;
///
///     assert!(result.succeeded);
/// }
/// ```
pub async fn execute_with_retry_async<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, String>>,
{
    let start = std::time::Instant::now();
    let mut last_error = None;
    let mut attempts = 0;

    for attempt in 0..=config.max_retries {
        attempts = attempt + 1;
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts,
                    total_duration: start.elapsed(),
                    succeeded: true,
                };
            }
            Err(e) => {
                let retryable = is_retryable_error(&e);
                last_error = Some(e);
                if !retryable {
                    break;
                }

                if attempt < config.max_retries {
                    let delay = config.calculate_delay(attempt + 1);
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    RetryResult {
        result: Err(last_error.unwrap_or_else(|| "All retries exhausted".to_string())),
        attempts,
        total_duration: start.elapsed(),
        succeeded: false,
    }
}
