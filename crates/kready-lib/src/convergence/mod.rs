//! Rollout convergence waiters
//!
//! Each waiter wraps a collector call in a probe for the poll engine: the
//! probe is retryable while the observed count is short of the target and
//! succeeds once it is met. A timeout after partial progress is reported as
//! [`Convergence::Partial`] rather than an error.

mod waiters;

#[cfg(test)]
mod tests;

pub use waiters::{
    wait_for_connectivity, wait_for_pods, wait_for_volumes, PodTarget, VolumeTarget, WaitOptions,
};

use crate::collector::CollectorError;
use crate::poll::PollError;
use serde::Serialize;
use thiserror::Error;

/// Successful end state of a waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Convergence {
    /// Every expected unit converged
    Complete { converged: usize },
    /// Timed out with some, but not all, units converged
    Partial { converged: usize, expected: usize },
}

impl Convergence {
    pub fn is_complete(&self) -> bool {
        matches!(self, Convergence::Complete { .. })
    }

    pub fn converged(&self) -> usize {
        match self {
            Convergence::Complete { converged } | Convergence::Partial { converged, .. } => {
                *converged
            }
        }
    }
}

/// Reason a probe is not satisfied yet
#[derive(Debug, Clone, Error)]
pub enum Pending {
    #[error("{converged}/{expected} {resource} ready")]
    Count {
        resource: &'static str,
        converged: usize,
        expected: usize,
    },

    #[error(transparent)]
    Collector(CollectorError),
}

/// Terminal waiter failure
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out waiting for {resource} ({converged}/{expected} ready)")]
    Timeout {
        resource: &'static str,
        converged: usize,
        expected: usize,
    },

    #[error("gave up waiting for {resource} after {attempts} attempts: {last}")]
    RetriesExhausted {
        resource: &'static str,
        attempts: u32,
        last: Pending,
    },

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error("wait cancelled")]
    Cancelled,
}

/// Map an engine result onto the waiter outcome
pub(crate) fn settle(
    resource: &'static str,
    expected: usize,
    result: Result<usize, PollError<Pending>>,
) -> Result<Convergence, WaitError> {
    match result {
        Ok(converged) => Ok(Convergence::Complete { converged }),
        Err(PollError::Timeout { last, .. }) => {
            let converged = match last {
                Some(Pending::Count { converged, .. }) => converged,
                _ => 0,
            };
            if converged > 0 && converged < expected {
                tracing::debug!(resource, converged, expected, "partial convergence at timeout");
                Ok(Convergence::Partial {
                    converged,
                    expected,
                })
            } else {
                Err(WaitError::Timeout {
                    resource,
                    converged,
                    expected,
                })
            }
        }
        Err(PollError::RetriesExhausted { attempts, last }) => Err(WaitError::RetriesExhausted {
            resource,
            attempts,
            last,
        }),
        Err(PollError::Probe(Pending::Collector(error))) => Err(WaitError::Collector(error)),
        // Waiters only fail fast on collector errors; a final count is a broken collector
        Err(PollError::Probe(last)) => Err(WaitError::Collector(CollectorError::malformed(
            format!("{} reported a final count: {}", resource, last),
        ))),
        Err(PollError::Cancelled) => Err(WaitError::Cancelled),
    }
}
