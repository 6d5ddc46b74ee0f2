//! Bounded retry with exponential backoff
//!
//! Catalog page requests and stream transfers are wrapped in [`download_with_retry`].
//! Only transient failures are retried: dropped connections, timeouts, stalled
//! transfers and server-side HTTP errors. Permanent failures (no matching format,
//! a non-zero muxer exit, a missing channel) surface immediately.
//!
//! ```no_run
//! use channel_dl::config::RetryConfig;
//! use channel_dl::retry::download_with_retry;
//! use channel_dl::Error;
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RetryConfig::default();
//! let body = download_with_retry(&config, || async {
//!     Ok::<_, Error>("page".to_string())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, FetchError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Classifies errors as transient (worth another attempt) or permanent
pub trait IsRetryable {
    /// Returns true if the operation should be attempted again
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_body()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::Interrupted
            ),
            // 429 and 5xx are the catalog's way of saying "later"
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            Error::Fetch(e) => match e {
                FetchError::Transfer { .. } | FetchError::Stalled { .. } => true,
                FetchError::NoMatchingFormat { .. }
                | FetchError::Resolve { .. }
                | FetchError::Rejected { .. } => false,
            },
            Error::Config { .. }
            | Error::Lookup(_)
            | Error::Enumeration(_)
            | Error::Merge(_)
            | Error::Serialization(_)
            | Error::ExternalTool(_)
            | Error::NotSupported(_)
            | Error::Other(_) => false,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the retry budget is spent
///
/// `config.max_attempts` counts retries, so the operation runs at most
/// `max_attempts + 1` times. The last error is returned unchanged.
pub async fn download_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            tracing::debug!(error = %error, "operation failed with non-retryable error");
            return Err(error);
        }
        if attempt >= config.max_attempts {
            tracing::error!(
                error = %error,
                attempts = attempt + 1,
                "operation failed after all retry attempts exhausted"
            );
            return Err(error);
        }

        attempt += 1;
        let wait = if config.jitter {
            add_jitter(delay)
        } else {
            delay
        };
        tracing::warn!(
            error = %error,
            attempt,
            max_attempts = config.max_attempts,
            delay_ms = wait.as_millis(),
            "operation failed, retrying"
        );
        tokio::time::sleep(wait).await;

        delay = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
            .min(config.max_delay);
    }
}

/// Stretch a delay by a random factor in [1, 2]
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + factor))
}
