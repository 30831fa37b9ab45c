//! Async driver for the poll state machine

use super::state::{saturating_deadline, FAR_FUTURE};
use super::{PollError, PollSettings, PollState, ProbeError, Step};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Tokio intervals reject a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Status sink invoked once per tick with a human-readable line
pub type ProgressCallback<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Poll `probe` until it succeeds or a bound is hit
///
/// The first probe runs one full interval after entry. Exactly one probe is
/// in flight at a time. Cancellation is honoured between probes and takes
/// precedence over both bounds; the deadline also interrupts a probe that is
/// still running.
pub async fn poll<T, E, F, Fut>(
    settings: &PollSettings,
    cancel: &CancellationToken,
    progress: Option<ProgressCallback<'_>>,
    mut probe: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProbeError<E>>>,
    E: Display,
{
    let start = Instant::now();
    let mut state = PollState::new(settings, start);

    let period = settings.interval.clamp(MIN_INTERVAL, FAR_FUTURE);
    let mut ticker = interval_at(saturating_deadline(start, period), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = sleep_until(state.deadline());
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = &mut deadline => return Err(state.timeout(Instant::now())),
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            outcome = probe() => outcome,
            _ = &mut deadline => return Err(state.timeout(Instant::now())),
        };

        if let Some(report) = progress {
            report(&describe(&outcome, state.attempts() + 1));
        }

        state = match state.step(outcome, Instant::now()) {
            Step::Done(result) => return result,
            Step::Continue(next) => next,
        };
        trace!(attempts = state.attempts(), "probe not satisfied yet");
    }
}

fn describe<T, E: Display>(outcome: &Result<T, ProbeError<E>>, attempt: u32) -> String {
    match outcome {
        Ok(_) => format!("attempt {}: condition met", attempt),
        Err(ProbeError::Retryable(error)) => format!("attempt {}: {}", attempt, error),
        Err(ProbeError::Fatal(error)) => format!("attempt {}: failed: {}", attempt, error),
    }
}
