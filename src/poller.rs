//! Data availability poller.
//!
//! The host fills the initial-data slot some time after the widget mounts.
//! `DataPoller` checks the slot immediately, then once per `interval` for at
//! most `max_attempts` retries, and gives up with `DataUnavailable` exactly
//! `max_attempts × interval` after it started. Cancelling the token stops the
//! pending retry at once.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::errors::WidgetError;
use crate::host::{HostBridge, HostCapability};

/// Retry schedule for the initial-data slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between retries.
    pub interval: Duration,
    /// Retries after the immediate check.
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Total time before the poller gives up.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Whether a slot value counts as delivered.
///
/// Hosts initialise the slot to `null` or `{}` before the payload lands.
pub fn is_delivered(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Bounded, cancellable wait for the host's initial payload.
#[derive(Debug, Clone)]
pub struct DataPoller {
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl DataPoller {
    pub fn new(policy: PollPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Wait for the slot to be populated.
    ///
    /// Returns `Unmounted` if cancelled, `CapabilityMissing` if the host has
    /// no initial-data slot at all, `DataUnavailable` once the budget is spent.
    pub async fn wait(&self, host: &dyn HostBridge) -> Result<Value, WidgetError> {
        if self.cancel.is_cancelled() {
            return Err(WidgetError::Unmounted);
        }
        if !host.capabilities().initial_data {
            return Err(WidgetError::CapabilityMissing(HostCapability::InitialData));
        }

        let started = Instant::now();
        if let Some(value) = Self::check(host) {
            return Ok(value);
        }

        for attempt in 1..=self.policy.max_attempts {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    log::debug!("Poll cancelled before attempt {}", attempt);
                    return Err(WidgetError::Unmounted);
                }
                _ = sleep(self.policy.interval) => {}
            }

            if let Some(value) = Self::check(host) {
                log::debug!(
                    "Initial data delivered on retry {} after {:?}",
                    attempt,
                    started.elapsed()
                );
                return Ok(value);
            }
        }

        let waited = started.elapsed();
        log::warn!(
            "Initial data not delivered after {} retries ({:?})",
            self.policy.max_attempts,
            waited
        );
        Err(WidgetError::DataUnavailable {
            attempts: self.policy.max_attempts,
            waited,
        })
    }

    fn check(host: &dyn HostBridge) -> Option<Value> {
        host.initial_data().filter(is_delivered)
    }
}
