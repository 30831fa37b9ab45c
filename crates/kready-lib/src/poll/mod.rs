//! Bounded asynchronous polling
//!
//! A generic retry/timeout primitive with no knowledge of Kubernetes. A
//! probe reports success, a retryable "not yet" condition, or a fatal error;
//! the engine stops on success, fatal error, retry exhaustion, deadline or
//! cancellation, whichever comes first.

mod engine;
mod state;


pub use engine::{poll, ProgressCallback};
pub use state::{PollState, Step};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default interval between probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default wall-clock bound for one polling run
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Bounds for one polling run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Delay before the first probe and between probes
    pub interval: Duration,
    /// Hard wall-clock deadline, measured from entry
    pub timeout: Duration,
    /// Retryable results tolerated after the first before giving up
    pub max_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            max_retries: u32::MAX,
        }
    }
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            timeout,
            max_retries,
        }
    }
}

/// Outcome a probe reports when it is not successful
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError<E> {
    /// Condition not met yet; keep polling
    Retryable(E),
    /// Stop immediately and surface the error as-is
    Fatal(E),
}

impl<E> ProbeError<E> {
    pub fn retryable(error: impl Into<E>) -> Self {
        ProbeError::Retryable(error.into())
    }

    pub fn fatal(error: impl Into<E>) -> Self {
        ProbeError::Fatal(error.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProbeError::Retryable(_))
    }

    pub fn into_inner(self) -> E {
        match self {
            ProbeError::Retryable(error) | ProbeError::Fatal(error) => error,
        }
    }
}

/// Terminal polling failure
#[derive(Debug, Error)]
pub enum PollError<E> {
    /// Deadline elapsed before success or retry exhaustion
    #[error("timed out after {elapsed:?} ({attempts} attempts)")]
    Timeout {
        attempts: u32,
        elapsed: Duration,
        /// Last retryable error observed, if any probe completed
        last: Option<E>,
    },

    /// Too many consecutive retryable results; `last` is the final cause
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: E },

    /// Non-retryable probe error, passed through unchanged
    #[error("{0}")]
    Probe(E),

    /// Caller cancelled the run
    #[error("polling cancelled")]
    Cancelled,
}

impl<E> PollError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }

    /// Underlying probe error for exhausted or fatal outcomes
    pub fn into_cause(self) -> Option<E> {
        match self {
            PollError::RetriesExhausted { last, .. } => Some(last),
            PollError::Probe(error) => Some(error),
            PollError::Timeout { last, .. } => last,
            PollError::Cancelled => None,
        }
    }
}
