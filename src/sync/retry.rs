//! Fixed-interval polling with optional jitter.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default number of polling attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default spacing between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// The policy ran out of attempts without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("gave up after {attempts} attempts")]
pub struct PollExhausted {
    pub attempts: u32,
}

/// How often and how many times to poll for an eventually-consistent result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Upper bound of a uniformly random delay added to every interval.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration, jitter: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            jitter,
        }
    }

    /// Delay before the next attempt: `interval` plus up to `jitter`.
    pub fn delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Sleep, then call `attempt` with the 1-based attempt number, until it
    /// yields `Some` or the attempts run out.
    pub async fn poll<T, F, Fut>(&self, mut attempt: F) -> Result<T, PollExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for n in 1..=self.max_attempts {
            tokio::time::sleep(self.delay()).await;
            if let Some(value) = attempt(n).await {
                return Ok(value);
            }
            debug!(attempt = n, max_attempts = self.max_attempts, "Poll attempt came back empty");
        }

        Err(PollExhausted {
            attempts: self.max_attempts,
        })
    }
}
