//! Poll state machine
//!
//! The engine threads a [`PollState`] by value from tick to tick. Stepping
//! is pure given the probe outcome and the current instant, so the bounds
//! can be exercised without timers.

use super::{PollError, PollSettings, ProbeError};
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on any span the engine schedules, about 30 years
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + span`, capped so an "effectively forever" span cannot overflow
pub(crate) fn saturating_deadline(now: Instant, span: Duration) -> Instant {
    now.checked_add(span.min(FAR_FUTURE))
        .unwrap_or_else(|| now + FAR_FUTURE)
}

/// Progress of one polling run
#[derive(Debug)]
pub struct PollState<E> {
    attempts: u32,
    retries: u32,
    max_retries: u32,
    started: Instant,
    deadline: Instant,
    last_retryable: Option<E>,
}

/// Result of feeding one probe outcome into the state machine
#[derive(Debug)]
pub enum Step<T, E> {
    /// Terminal: success or a terminal error
    Done(Result<T, PollError<E>>),
    /// Keep polling with the updated state
    Continue(PollState<E>),
}

impl<E> PollState<E> {
    pub fn new(settings: &PollSettings, now: Instant) -> Self {
        Self {
            attempts: 0,
            retries: 0,
            max_retries: settings.max_retries,
            started: now,
            deadline: saturating_deadline(now, settings.timeout),
            last_retryable: None,
        }
    }

    /// Probes completed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Consecutive retryable results so far
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn last_retryable(&self) -> Option<&E> {
        self.last_retryable.as_ref()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Feed one probe outcome
    pub fn step<T>(mut self, outcome: Result<T, ProbeError<E>>, now: Instant) -> Step<T, E> {
        self.attempts += 1;

        match outcome {
            Ok(value) => Step::Done(Ok(value)),
            Err(ProbeError::Fatal(error)) => Step::Done(Err(PollError::Probe(error))),
            Err(ProbeError::Retryable(error)) => {
                self.retries += 1;
                if self.retries > self.max_retries {
                    return Step::Done(Err(PollError::RetriesExhausted {
                        attempts: self.attempts,
                        last: error,
                    }));
                }

                self.last_retryable = Some(error);
                if self.is_expired(now) {
                    return Step::Done(Err(self.timeout(now)));
                }
                Step::Continue(self)
            }
        }
    }

    /// Terminal timeout carrying the last retryable error seen
    pub fn timeout(self, now: Instant) -> PollError<E> {
        PollError::Timeout {
            attempts: self.attempts,
            elapsed: now.saturating_duration_since(self.started),
            last: self.last_retryable,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }
}
