//! Rollout convergence waits

use anyhow::{Context, Result};
use kready_lib::convergence::{
    wait_for_connectivity, wait_for_pods, wait_for_volumes, Convergence, PodTarget, VolumeTarget,
    WaitOptions,
};
use kready_lib::{ConnectivityProbe, FactCollector, VersionAnnotation};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::output::{print_info, print_json, print_success, print_warning, OutputFormat};

/// Annotation carrying the workload version on every pod
pub const VERSION_ANNOTATION: &str = "kready.io/version";

/// Wait for the release's pods to run, optionally at a given version
pub async fn run_pods(
    collector: &dyn FactCollector,
    settings: &Settings,
    selector: Option<String>,
    expected: usize,
    version: Option<String>,
    cancel: CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    let target = PodTarget {
        namespace: settings.namespace.clone(),
        label_selector: selector.unwrap_or_else(|| settings.release_selector()),
        version: version.map(|v| VersionAnnotation::new(VERSION_ANNOTATION, v)),
        expected,
    };
    let progress = progress_sink(format);
    let options = WaitOptions::new(settings.poll_settings(), cancel).with_progress(&progress);

    let outcome = wait_for_pods(collector, &target, &options)
        .await
        .context("Pods did not become ready")?;
    report("pods running", outcome, format)
}

/// Wait for the release's volume claims to bind
pub async fn run_volumes(
    collector: &dyn FactCollector,
    settings: &Settings,
    selector: Option<String>,
    expected: usize,
    cancel: CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    let target = VolumeTarget {
        namespace: settings.namespace.clone(),
        label_selector: selector.unwrap_or_else(|| settings.release_selector()),
        expected,
    };
    let progress = progress_sink(format);
    let options = WaitOptions::new(settings.poll_settings(), cancel).with_progress(&progress);

    let outcome = wait_for_volumes(collector, &target, &options)
        .await
        .context("Volume claims did not bind")?;
    report("volume claims bound", outcome, format)
}

/// Wait for an endpoint to answer
pub async fn run_connectivity(
    probe: &dyn ConnectivityProbe,
    settings: &Settings,
    cancel: CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    if let OutputFormat::Table = format {
        print_info(&format!("Waiting for {}", probe.target()));
    }
    let progress = progress_sink(format);
    let options = WaitOptions::new(settings.poll_settings(), cancel).with_progress(&progress);

    let outcome = wait_for_connectivity(probe, &options)
        .await
        .with_context(|| format!("{} is not reachable", probe.target()))?;
    report("endpoint reachable", outcome, format)
}

/// Per-tick status lines; silent in JSON mode so stdout stays parseable
fn progress_sink(format: OutputFormat) -> impl Fn(&str) + Send + Sync {
    move |line: &str| {
        if let OutputFormat::Table = format {
            println!("  {}", line);
        }
    }
}

fn report(what: &str, outcome: Convergence, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Table => {
            match outcome {
                Convergence::Complete { converged } => {
                    print_success(&format!("{} {}", converged, what));
                }
                Convergence::Partial {
                    converged,
                    expected,
                } => {
                    print_warning(&format!(
                        "only {}/{} {} before the timeout",
                        converged, expected, what
                    ));
                }
            }
            Ok(())
        }
    }
}
