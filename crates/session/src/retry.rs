//! Exponential-backoff retry for establishing device connections.
//!
//! Firewalls under load (or a lab VM still booting) regularly refuse the
//! first connection. [`connect_with_retry`] keeps retrying with increasing
//! delays up to [`RetryConfig::max_attempts`]. Authentication failures are
//! never retried.

use std::future::Future;
use std::time::Duration;

use crate::transport::{self, ConnectParams, Transport, TransportError};

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A config that tries exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is exhausted. The last error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    address: &str,
    config: &RetryConfig,
    mut attempt: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut number = 0u32;

    loop {
        number += 1;
        match attempt().await {
            Ok(value) => {
                if number > 1 {
                    tracing::info!(address, attempt = number, "Connected after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() || number >= max_attempts => {
                tracing::warn!(address, attempt = number, error = %e, "Giving up on connection");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    address,
                    attempt = number,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Connection attempt {number} failed, retrying",
                );
            }
        }

        tokio::time::sleep(delay).await;
        delay = next_delay(delay, config);
    }
}

/// Open a transport to `params`, retrying per `config`.
pub async fn connect_with_retry(
    params: &ConnectParams,
    config: &RetryConfig,
) -> Result<Box<dyn Transport>, TransportError> {
    let address = params.address();
    retry_with_backoff(&address, config, || transport::connect(params)).await
}
