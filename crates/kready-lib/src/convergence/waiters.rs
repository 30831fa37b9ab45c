//! Waiters composing collector calls with the poll engine

use super::{settle, Convergence, Pending, WaitError};
use crate::collector::{CollectorError, ConnectivityProbe, FactCollector, VersionAnnotation};
use crate::poll::{poll, PollSettings, ProbeError, ProgressCallback};
use tokio_util::sync::CancellationToken;

/// Pods expected to be running after a rollout
#[derive(Debug, Clone)]
pub struct PodTarget {
    pub namespace: String,
    pub label_selector: String,
    pub version: Option<VersionAnnotation>,
    pub expected: usize,
}

/// Volume claims expected to be bound after a rollout
#[derive(Debug, Clone)]
pub struct VolumeTarget {
    pub namespace: String,
    pub label_selector: String,
    pub expected: usize,
}

/// Bounds, cancellation and progress sink shared by every waiter
#[derive(Clone)]
pub struct WaitOptions<'a> {
    pub settings: PollSettings,
    pub cancel: CancellationToken,
    pub progress: Option<ProgressCallback<'a>>,
}

impl<'a> WaitOptions<'a> {
    pub fn new(settings: PollSettings, cancel: CancellationToken) -> Self {
        Self {
            settings,
            cancel,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback<'a>) -> Self {
        self.progress = Some(progress);
        self
    }
}

fn count_probe(
    resource: &'static str,
    observed: Result<usize, CollectorError>,
    expected: usize,
) -> Result<usize, ProbeError<Pending>> {
    let converged = observed.map_err(|e| ProbeError::Fatal(Pending::Collector(e)))?;
    if converged >= expected {
        Ok(converged)
    } else {
        Err(ProbeError::Retryable(Pending::Count {
            resource,
            converged,
            expected,
        }))
    }
}

/// Wait until the expected number of pods is running
pub async fn wait_for_pods(
    collector: &dyn FactCollector,
    target: &PodTarget,
    options: &WaitOptions<'_>,
) -> Result<Convergence, WaitError> {
    const RESOURCE: &str = "pods";

    let result = poll(&options.settings, &options.cancel, options.progress, || async move {
        let observed = collector
            .count_running_pods(
                &target.namespace,
                &target.label_selector,
                target.version.as_ref(),
            )
            .await;
        count_probe(RESOURCE, observed, target.expected)
    })
    .await;

    settle(RESOURCE, target.expected, result)
}

/// Wait until the expected number of volume claims is bound
pub async fn wait_for_volumes(
    collector: &dyn FactCollector,
    target: &VolumeTarget,
    options: &WaitOptions<'_>,
) -> Result<Convergence, WaitError> {
    const RESOURCE: &str = "volumes";

    let result = poll(&options.settings, &options.cancel, options.progress, || async move {
        let observed = collector
            .count_bound_volume_claims(&target.namespace, &target.label_selector)
            .await;
        count_probe(RESOURCE, observed, target.expected)
    })
    .await;

    settle(RESOURCE, target.expected, result)
}

/// Wait until an endpoint answers; failed checks are retried
pub async fn wait_for_connectivity(
    probe: &dyn ConnectivityProbe,
    options: &WaitOptions<'_>,
) -> Result<Convergence, WaitError> {
    const RESOURCE: &str = "connectivity";

    let result = poll(&options.settings, &options.cancel, options.progress, || async move {
        probe
            .check()
            .await
            .map(|()| 1)
            .map_err(|e| ProbeError::Retryable(Pending::Collector(e)))
    })
    .await;

    settle(RESOURCE, 1, result)
}
