//! Outbound alert channel.
//!
//! A [`Notifier`] delivers one text message per call. Transports that can be
//! rate limited wrap their single send in a [`RetryPolicy`]; callers go through
//! [`dispatch`], which logs failures instead of returning them.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub mod format;
pub mod telegram;

pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport answered "too many requests"; the only retryable failure.
    #[error("rate limited by notification API")]
    RateLimited,

    #[error("notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notification transport error: {0}")]
    Transport(String),

    #[error("notification still rate limited after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Send `message`, logging any failure. Notification problems never
/// propagate into the scan loop.
pub async fn dispatch(notifier: &dyn Notifier, message: &str) {
    if let Err(e) = notifier.notify(message).await {
        warn!(error = %e, "[NOTIFY] message dropped");
    }
}

/// Exponential backoff applied to rate-limited sends.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// has been rate limited `max_attempts` times.
    ///
    /// Waits `d, 2d, 4d, ...` between attempts; no wait follows the last one.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, NotifyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NotifyError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.initial_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Err(NotifyError::RateLimited) if attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        "[NOTIFY] rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(NotifyError::RateLimited) => {
                    return Err(NotifyError::Exhausted { attempts: attempt });
                }
                other => return other,
            }
        }
    }
}

/// Writes alerts to the log; used when no Telegram credentials are set.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        info!(target: "alerts", "[ALERT] {message}");
        Ok(())
    }
}
