use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

/// Interval and hard attempt ceiling for a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Enough attempts at `interval` to cover `total` (at least one)
    pub fn from_timeout(total: Duration, interval: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            let interval_ms = interval.as_millis().max(1);
            let total_ms = total.as_millis();
            ((total_ms + interval_ms - 1) / interval_ms).clamp(1, u32::MAX as u128) as u32
        };
        Self::new(interval, attempts)
    }

    /// Polls until the probe resolves or the caller drops the future
    pub fn unbounded(interval: Duration) -> Self {
        Self::new(interval, u32::MAX)
    }

    /// Upper bound on time spent sleeping between attempts
    pub fn total_budget(&self) -> Duration {
        self.interval
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 30)
    }
}

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Pending,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError<E> {
    #[error("no result after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("{0}")]
    Aborted(E),
}

/// Run `probe` until it returns `Ready`, sleeping `interval` between
/// attempts. The probe receives the 1-based attempt number. An `Err` from the
/// probe stops polling immediately; probes that want to tolerate transient
/// failures should map them to `Pending` themselves.
pub async fn poll_until<T, E, F, Fut>(config: &PollConfig, mut probe: F) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, E>>,
{
    for attempt in 1..=config.max_attempts {
        match probe(attempt).await.map_err(PollError::Aborted)? {
            PollOutcome::Ready(value) => return Ok(value),
            PollOutcome::Pending => {
                trace!(attempt, max_attempts = config.max_attempts, "poll pending");
            }
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    Err(PollError::Exhausted {
        attempts: config.max_attempts,
    })
}
