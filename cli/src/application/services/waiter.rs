//! Long-running operation polling with bounded backoff, a deadline and
//! cooperative cancellation.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::application::ports::{ComputeProvider, Sleeper};
use crate::domain::config::PollConfig;
use crate::domain::error::RescueError;
use crate::domain::instance::{Operation, OperationStatus, ZoneRef};

/// Backoff schedule and deadline for [`OperationWaiter`].
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Cumulative sleep after which waiting gives up; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    #[must_use]
    pub fn from_config(config: &PollConfig) -> Self {
        Self {
            initial_interval: Duration::from_secs(config.initial_interval_secs),
            max_interval: Duration::from_secs(config.max_interval_secs),
            multiplier: config.multiplier,
            timeout: config.timeout(),
        }
    }

    /// Constant interval with no deadline.
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay following `current`, capped at `max_interval`.
    #[must_use]
    pub fn next_delay(&self, current: Duration) -> Duration {
        let factor = if self.multiplier.is_finite() && self.multiplier >= 1.0 {
            self.multiplier
        } else {
            1.0
        };
        current.mul_f64(factor).min(self.max_interval.max(self.initial_interval))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

/// Polls an operation handle until it reaches `DONE`.
pub struct OperationWaiter<'a, P, S> {
    provider: &'a P,
    sleeper: &'a S,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl<'a, P: ComputeProvider, S: Sleeper> OperationWaiter<'a, P, S> {
    #[must_use]
    pub fn new(provider: &'a P, sleeper: &'a S, policy: PollPolicy, cancel: CancellationToken) -> Self {
        Self {
            provider,
            sleeper,
            policy,
            cancel,
        }
    }

    /// Wait for `operation` to finish.
    ///
    /// The first poll happens immediately; later polls follow the backoff
    /// schedule. Cancellation is honoured before each poll and during the
    /// sleep between polls, never while a provider call is in flight.
    ///
    /// # Errors
    ///
    /// - `Operation` if the operation finished with an error payload.
    /// - `Timeout` once the cumulative sleep reaches the policy deadline.
    ///   The last sleep is shortened so the deadline is never overshot.
    /// - `Cancelled` if the cancellation token fires.
    /// - `Compute` if polling itself fails.
    pub async fn wait(&self, zone: &ZoneRef, operation: &Operation) -> Result<Operation, RescueError> {
        let name = operation.name.as_str();
        let mut delay = self.policy.initial_interval;
        let mut waited = Duration::ZERO;
        let mut polls: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RescueError::Cancelled {
                    operation: name.to_string(),
                });
            }

            let current = self.provider.get_operation(zone, name).await?;
            polls += 1;
            debug!(operation = name, status = ?current.status, polls, "polled operation");

            if current.status == OperationStatus::Done {
                if let Some(failure) = current.error {
                    warn!(operation = name, %failure, "operation failed");
                    return Err(RescueError::Operation {
                        operation: name.to_string(),
                        failure,
                    });
                }
                return Ok(current);
            }

            if self.policy.timeout.is_some_and(|limit| waited >= limit) {
                return Err(RescueError::Timeout {
                    operation: name.to_string(),
                    waited_secs: waited.as_secs(),
                });
            }

            let nap = self
                .policy
                .timeout
                .map_or(delay, |limit| delay.min(limit.saturating_sub(waited)));
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(RescueError::Cancelled {
                        operation: name.to_string(),
                    });
                }
                () = self.sleeper.sleep(nap) => {}
            }
            waited += nap;
            delay = self.policy.next_delay(delay);
        }
    }
}
