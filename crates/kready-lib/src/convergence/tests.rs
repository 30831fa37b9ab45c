//! Waiter tests against a scripted collector

use super::*;
use crate::collector::{CollectorError, ConnectivityProbe, FactCollector, VersionAnnotation};
use crate::models::NodeFact;
use crate::poll::PollSettings;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

/// Collector that replays a scripted sequence of counts, repeating the last one
struct MockCollector {
    pod_counts: Vec<Result<usize, CollectorError>>,
    volume_counts: Vec<usize>,
    calls: AtomicUsize,
    seen_version: Mutex<Option<VersionAnnotation>>,
}

impl MockCollector {
    fn pods(counts: Vec<Result<usize, CollectorError>>) -> Self {
        Self {
            pod_counts: counts,
            volume_counts: vec![],
            calls: AtomicUsize::new(0),
            seen_version: Mutex::new(None),
        }
    }

    fn volumes(counts: Vec<usize>) -> Self {
        Self {
            pod_counts: vec![],
            volume_counts: counts,
            calls: AtomicUsize::new(0),
            seen_version: Mutex::new(None),
        }
    }

    fn next_index(&self, len: usize) -> usize {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        call.min(len.saturating_sub(1))
    }
}

#[async_trait]
impl FactCollector for MockCollector {
    async fn list_nodes(&self) -> Result<Vec<NodeFact>, CollectorError> {
        Ok(vec![])
    }

    async fn count_running_pods(
        &self,
        _namespace: &str,
        _label_selector: &str,
        version: Option<&VersionAnnotation>,
    ) -> Result<usize, CollectorError> {
        *self.seen_version.lock().unwrap() = version.cloned();
        let index = self.next_index(self.pod_counts.len());
        self.pod_counts[index].clone()
    }

    async fn count_bound_volume_claims(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<usize, CollectorError> {
        let index = self.next_index(self.volume_counts.len());
        Ok(self.volume_counts[index])
    }
}

struct FlakyEndpoint {
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl ConnectivityProbe for FlakyEndpoint {
    fn target(&self) -> &str {
        "http://backend:8080/health"
    }

    async fn check(&self) -> Result<(), CollectorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            Err(CollectorError::unreachable("connection refused"))
        } else {
            Ok(())
        }
    }
}

fn options<'a>(timeout_ms: u64) -> WaitOptions<'a> {
    WaitOptions::new(
        PollSettings::new(
            Duration::from_millis(10),
            Duration::from_millis(timeout_ms),
            u32::MAX,
        ),
        CancellationToken::new(),
    )
}

fn pod_target(expected: usize) -> PodTarget {
    PodTarget {
        namespace: "kready".to_string(),
        label_selector: "app=agent".to_string(),
        version: Some(VersionAnnotation::new("kready.io/version", "1.2.0")),
        expected,
    }
}

#[tokio::test(start_paused = true)]
async fn test_pods_converge() {
    let collector = MockCollector::pods(vec![Ok(0), Ok(1), Ok(3)]);

    let outcome = wait_for_pods(&collector, &pod_target(3), &options(1000))
        .await
        .unwrap();

    assert_eq!(outcome, Convergence::Complete { converged: 3 });
    assert_eq!(collector.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        collector.seen_version.lock().unwrap().as_ref().map(|v| v.value.as_str()),
        Some("1.2.0")
    );
}

#[tokio::test(start_paused = true)]
async fn test_pods_partial_success_on_timeout() {
    let collector = MockCollector::pods(vec![Ok(1), Ok(2)]);

    let outcome = wait_for_pods(&collector, &pod_target(4), &options(100))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Convergence::Partial {
            converged: 2,
            expected: 4
        }
    );
    assert!(!outcome.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_pods_zero_progress_is_timeout() {
    let collector = MockCollector::pods(vec![Ok(0)]);

    let error = wait_for_pods(&collector, &pod_target(2), &options(100))
        .await
        .unwrap_err();

    match error {
        WaitError::Timeout {
            resource,
            converged,
            expected,
        } => {
            assert_eq!(resource, "pods");
            assert_eq!(converged, 0);
            assert_eq!(expected, 2);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_collector_error_is_fatal() {
    let collector = MockCollector::pods(vec![Ok(1), Err(CollectorError::malformed("bad pod list"))]);

    let error = wait_for_pods(&collector, &pod_target(2), &options(10_000))
        .await
        .unwrap_err();

    assert!(matches!(error, WaitError::Collector(CollectorError::Malformed(_))));
    assert_eq!(collector.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_volumes_converge() {
    let collector = MockCollector::volumes(vec![1, 2]);
    let target = VolumeTarget {
        namespace: "kready".to_string(),
        label_selector: "app=backend".to_string(),
        expected: 2,
    };

    let outcome = assert_ok!(wait_for_volumes(&collector, &target, &options(1000)).await);

    assert_eq!(outcome.converged(), 2);
    assert!(outcome.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_retries_until_reachable() {
    let endpoint = FlakyEndpoint {
        failures: 2,
        calls: AtomicUsize::new(0),
    };

    let outcome = wait_for_connectivity(&endpoint, &options(1000)).await.unwrap();

    assert_eq!(outcome, Convergence::Complete { converged: 1 });
    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_timeout() {
    let endpoint = FlakyEndpoint {
        failures: usize::MAX,
        calls: AtomicUsize::new(0),
    };

    let error = assert_err!(wait_for_connectivity(&endpoint, &options(50)).await);
    assert!(matches!(error, WaitError::Timeout { resource: "connectivity", .. }));
}

#[tokio::test]
async fn test_cancelled_wait() {
    let collector = MockCollector::pods(vec![Ok(0)]);
    let options = options(1000);
    options.cancel.cancel();

    let error = wait_for_pods(&collector, &pod_target(1), &options)
        .await
        .unwrap_err();
    assert!(matches!(error, WaitError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_progress_reports_counts() {
    let collector = MockCollector::pods(vec![Ok(1), Ok(2)]);
    let lines = Mutex::new(Vec::new());
    let report = |line: &str| lines.lock().unwrap().push(line.to_string());
    let options = options(1000).with_progress(&report);

    wait_for_pods(&collector, &pod_target(2), &options).await.unwrap();

    let lines = lines.lock().unwrap();
    assert_eq!(lines[0], "attempt 1: 1/2 pods ready");
    assert_eq!(lines[1], "attempt 2: condition met");
}

#[test]
fn test_final_count_maps_to_collector_error() {
    let pending = Pending::Count {
        resource: "pods",
        converged: 1,
        expected: 3,
    };

    match settle("pods", 3, Err(PollError::Probe(pending))) {
        Err(WaitError::Collector(CollectorError::Malformed(message))) => {
            assert!(message.contains("1/3 pods ready"), "got: {}", message);
        }
        other => panic!("unexpected {:?}", other),
    }

    let api = CollectorError::Api("connection refused".to_string());
    assert!(matches!(
        settle("pods", 3, Err(PollError::Probe(Pending::Collector(api)))),
        Err(WaitError::Collector(CollectorError::Api(_)))
    ));
}
