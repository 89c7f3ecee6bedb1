//! Retry helpers.
//!
//! [`with_retry`] wraps HTTP calls with exponential backoff and retries only
//! transient errors (429 rate limit, 5xx server errors, network timeouts).
//! [`retry_draft`] bounds generator calls: a fixed number of attempts, each
//! with its own deadline, where a timeout counts as a failed attempt.

use anima_core::CoreError;
use anyhow::Result;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for each subsequent delay.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

/// Determine if a status code is retryable.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS         // 429
        || status == StatusCode::INTERNAL_SERVER_ERROR // 500
        || status == StatusCode::BAD_GATEWAY           // 502
        || status == StatusCode::SERVICE_UNAVAILABLE   // 503
        || status == StatusCode::GATEWAY_TIMEOUT       // 504
        || status == StatusCode::REQUEST_TIMEOUT // 408
}

/// Execute an async HTTP operation with retry logic.
///
/// The `operation` closure is called repeatedly until it succeeds, returns a
/// non-retryable error, or `max_attempts` is exhausted.
pub async fn with_retry<F, Fut>(
    config: &RetryConfig,
    provider_name: &str,
    operation: F,
) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let mut delay = config.initial_delay;
    let mut last_error = None;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    if attempt > 1 {
                        tracing::info!("{} succeeded on attempt {}", provider_name, attempt);
                    }
                    return Ok(response);
                }

                let error_text = response.text().await.unwrap_or_default();
                if !is_retryable_status(status) {
                    anyhow::bail!("{} API Error ({}): {}", provider_name, status, error_text);
                }

                tracing::warn!(
                    "{} returned {} on attempt {}/{}: {}",
                    provider_name,
                    status,
                    attempt,
                    config.max_attempts,
                    error_text.chars().take(200).collect::<String>()
                );
                last_error = Some(format!("{} ({}): {}", provider_name, status, error_text));
            }
            Err(e) => {
                tracing::warn!(
                    "{} network error on attempt {}/{}: {}",
                    provider_name,
                    attempt,
                    config.max_attempts,
                    e
                );
                last_error = Some(format!("{}: {}", provider_name, e));
            }
        }

        if attempt < config.max_attempts {
            let sleep_time = delay + Duration::from_millis(rand_jitter());
            tracing::info!(
                "{} retrying in {:.1}s (attempt {}/{})",
                provider_name,
                sleep_time.as_secs_f64(),
                attempt + 1,
                config.max_attempts
            );
            tokio::time::sleep(sleep_time).await;

            delay = Duration::from_secs_f64(
                (delay.as_secs_f64() * config.backoff_factor).min(config.max_delay.as_secs_f64()),
            );
        }
    }

    anyhow::bail!(
        "All {} retry attempts exhausted. Last error: {}",
        config.max_attempts,
        last_error.unwrap_or_else(|| "unknown".to_string())
    )
}

/// Simple jitter: 0-500ms taken from the clock's sub-second nanos.
fn rand_jitter() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 500) as u64
}

/// Run a generator call up to `attempts` times, each bounded by `timeout`.
///
/// Errors, invalid drafts and timeouts all count as a failed attempt and are
/// logged. Returns `None` once every attempt has failed. There is no backoff
/// between attempts; transport-level backoff belongs to the provider.
pub async fn retry_draft<T, F, Fut>(
    operation: &'static str,
    attempts: u32,
    timeout: Duration,
    mut call: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        let err = match tokio::time::timeout(timeout, call()).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(e)) => e,
            Err(_) => CoreError::Timeout {
                operation,
                secs: timeout.as_secs(),
            }
            .into(),
        };
        tracing::warn!(
            "{} attempt {}/{} produced no result: {:#}",
            operation,
            attempt,
            attempts,
            err
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_draft_stops_at_first_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = retry_draft("test draft", 3, Duration::from_secs(1), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("flaky")
            }
            Ok::<_, anyhow::Error>(7)
        })
        .await;
        assert_eq!(out, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_draft_exhausts_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Option<()> = retry_draft("test draft", 3, Duration::from_secs(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), anyhow::Error>(CoreError::InvalidDraft("empty".into()).into())
        })
        .await;
        assert!(out.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_draft_timeout_counts_as_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Option<()> = retry_draft("test draft", 2, Duration::from_millis(10), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), anyhow::Error>(())
        })
        .await;
        assert!(out.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_draft_zero_attempts_still_tries_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = retry_draft("test draft", 0, Duration::from_secs(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>("x")
        })
        .await;
        assert_eq!(out, Some("x"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }
}
