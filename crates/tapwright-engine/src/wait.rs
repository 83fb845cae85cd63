//! Bounded polling against the remote UI tree.
//!
//! Every wait has a deadline and sleeps between evaluations; nothing here
//! blocks indefinitely or spins. Step-level timeouts are layered on top by the
//! flow runner.

use crate::backend::{Backend, BackendError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::trace;

/// Floor for the poll interval so a zero setting cannot turn into a spin loop.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Something to poll for.
///
/// `Ok(None)` means "not yet". Transient backend errors are treated the same
/// way; any other error ends the wait.
#[async_trait]
pub trait Condition<B: Backend + ?Sized>: Send {
    type Output: Send;

    async fn check(&mut self, backend: &mut B) -> Result<Option<Self::Output>, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("Timed out after {elapsed:?} ({polls} polls)")]
    Timeout {
        elapsed: Duration,
        polls: u32,
        /// Last transient error seen while polling, if any.
        last_error: Option<BackendError>,
    },

    #[error("Backend error while waiting: {0}")]
    Backend(#[from] BackendError),
}

/// Poll `condition` until it yields a value or `options.timeout` elapses.
///
/// The condition is always evaluated at least once, and once more at the
/// deadline, so a wait returns at most one poll interval late.
pub async fn wait_until<B, C>(
    backend: &mut B,
    condition: &mut C,
    options: WaitOptions,
) -> Result<C::Output, WaitError>
where
    B: Backend + ?Sized,
    C: Condition<B>,
{
    let start = Instant::now();
    let deadline = start + options.timeout;
    let mut polls = 0u32;
    let mut last_error = None;

    loop {
        polls += 1;
        match condition.check(backend).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                trace!("Transient error while polling: {}", e);
                last_error = Some(e);
            }
            Err(e) => return Err(WaitError::Backend(e)),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                elapsed: now - start,
                polls,
                last_error,
            });
        }
        sleep(options.poll_interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval_floor() {
        let opts = WaitOptions::new(Duration::from_secs(1), Duration::ZERO);
        assert_eq!(opts.poll_interval, MIN_POLL_INTERVAL);
        let opts = WaitOptions::new(Duration::from_secs(1), Duration::from_millis(250));
        assert_eq!(opts.poll_interval, Duration::from_millis(250));
    }
}
