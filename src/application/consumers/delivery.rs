//! Delivery state machine and retry policy.
//!
//! Every consumed record moves through one pass of the machine:
//!
//! ```text
//! Received -> Processing -> Acked
//!                        -> RetryScheduled { attempts_remaining }
//!                        -> DeadLettered
//! ```
//!
//! The remaining budget travels inside the retry envelope, so the machine
//! is stateless between deliveries and a record is attempted at most
//! `max_attempts + 1` times in total.

use std::time::Duration;

use crate::config::RetrySettings;
use crate::domain::events::RetryEnvelope;
use crate::shared::error::PipelineError;

/// Terminal and intermediate delivery states for one record pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Received,
    Processing,
    Acked,
    RetryScheduled { attempts_remaining: u32 },
    DeadLettered,
}

impl DeliveryState {
    /// Metric/log label for the outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processing => "processing",
            Self::Acked => "acked",
            Self::RetryScheduled { .. } => "retry_scheduled",
            Self::DeadLettered => "dead_lettered",
        }
    }
}

/// Retry budget and pacing shared by every notification consumer.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries granted after the first failed attempt
    pub max_attempts: u32,
    /// Delay applied before processing a retried record
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, settings.backoff())
    }

    /// Transition for a failure on a source topic (full budget unspent).
    ///
    /// Permanent failures skip the retry topic entirely; so does a zero
    /// budget.
    pub fn first_failure(&self, error: &PipelineError) -> DeliveryState {
        if error.is_permanent() || self.max_attempts == 0 {
            DeliveryState::DeadLettered
        } else {
            DeliveryState::RetryScheduled {
                attempts_remaining: self.max_attempts,
            }
        }
    }

    /// Transition for a failure on the retry topic, spending one unit of
    /// the envelope's budget.
    pub fn next_failure(&self, error: &PipelineError, envelope: &RetryEnvelope) -> DeliveryState {
        if error.is_permanent() {
            return DeliveryState::DeadLettered;
        }
        match envelope.decremented() {
            Some(next) => DeliveryState::RetryScheduled {
                attempts_remaining: next.attempts_remaining,
            },
            None => DeliveryState::DeadLettered,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}
