//! Readiness pipeline: validate, reconcile taints, tune
//!
//! Runs the pure stages in order against one node snapshot and hands the
//! deployment orchestration everything it needs to install: the report for
//! presentation, the nodes the workload may land on, the tolerations to
//! template and the overlays to merge.

use crate::error::{Error, Result};
use crate::models::NodeFact;
use crate::tolerations::{derive_tolerations, filter_tolerable_nodes, Toleration};
use crate::tuning::{
    calc_allocatable_resources, merge_overlays, overlays_for, tune, AllocatableResources,
    MergedValues, ResourcePreset, TuningTables,
};
use crate::validation::{validate_with, CompatibilityReport, NodeRequirements};
use serde::Serialize;

/// Everything decided before a workload is installed
#[derive(Debug, Clone, Serialize)]
pub struct RolloutPlan {
    pub report: CompatibilityReport,
    /// Compatible nodes plus tainted nodes re-admitted by known tolerations
    pub schedulable_nodes: Vec<NodeFact>,
    /// Tolerations the workload needs for the re-admitted nodes
    pub tolerations: Vec<Toleration>,
    pub resources: AllocatableResources,
    /// Agent preset first, backend preset second
    pub presets: Vec<ResourcePreset>,
    pub values: MergedValues,
}

/// Build a rollout plan from one node snapshot
pub fn plan_rollout(
    nodes: &[NodeFact],
    requirements: &NodeRequirements,
    known_tolerations: &[Toleration],
    tables: &TuningTables,
) -> Result<RolloutPlan> {
    let report = validate_with(requirements, nodes);

    let readmitted = filter_tolerable_nodes(&report.tainted_nodes, known_tolerations);
    let tolerations = derive_tolerations(&readmitted);

    let mut schedulable_nodes = report.compatible_nodes.clone();
    schedulable_nodes.extend(readmitted.iter().cloned());
    if schedulable_nodes.is_empty() {
        return Err(Error::NoCompatibleNodes {
            report: Box::new(report),
        });
    }

    // Re-admitted nodes still carry their taints; size from them as tolerated
    let sizing_nodes: Vec<NodeFact> = schedulable_nodes
        .iter()
        .cloned()
        .map(|mut node| {
            node.taints.clear();
            node
        })
        .collect();
    let resources = calc_allocatable_resources(&sizing_nodes)?;

    let presets = tune(&resources, tables);
    let values = merge_overlays(&overlays_for(&presets));

    tracing::debug!(
        compatible = report.compatible_nodes.len(),
        readmitted = readmitted.len(),
        presets = presets.len(),
        "rollout plan ready"
    );

    Ok(RolloutPlan {
        report,
        schedulable_nodes,
        tolerations,
        resources,
        presets,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Taint, TaintEffect, GIB};
    use crate::tuning::{AGENT_LOW_RESOURCES, BACKEND_LOW_RESOURCES};

    fn node(name: &str, cpu: u64, memory_gib: u64) -> NodeFact {
        NodeFact::new(name)
            .with_cpu(cpu)
            .with_memory(memory_gib * GIB)
            .with_kernel("5.10.0")
            .with_provider_id("gce://project/zone/".to_string() + name)
    }

    #[test]
    fn test_plan_small_cluster() {
        let nodes = vec![node("a", 2000, 4), node("b", 4000, 8)];
        let plan = plan_rollout(
            &nodes,
            &NodeRequirements::default(),
            &[],
            &TuningTables::default(),
        )
        .unwrap();

        assert_eq!(plan.schedulable_nodes.len(), 2);
        assert!(plan.tolerations.is_empty());
        assert_eq!(plan.resources.min_cpu_millicores, 2000);
        let ids: Vec<&str> = plan.presets.iter().map(|p| p.as_str()).collect();
        assert_eq!(ids, vec![AGENT_LOW_RESOURCES, BACKEND_LOW_RESOURCES]);
        assert!(!plan.values.is_empty());
    }

    #[test]
    fn test_plan_readmits_tolerated_nodes() {
        let gpu = Taint::new("nvidia.com/gpu", "present", TaintEffect::NoSchedule);
        let infra = Taint::new("dedicated", "infra", TaintEffect::NoSchedule);
        let nodes = vec![
            node("a", 8000, 32),
            node("gpu-1", 8000, 32).with_taint(gpu.clone()),
            node("infra-1", 8000, 32).with_taint(infra),
        ];

        let plan = plan_rollout(
            &nodes,
            &NodeRequirements::default(),
            &[Toleration::for_taint(&gpu)],
            &TuningTables::default(),
        )
        .unwrap();

        let names: Vec<&str> = plan.schedulable_nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "gpu-1"]);
        assert_eq!(plan.tolerations, vec![Toleration::for_taint(&gpu)]);
        assert_eq!(plan.resources.total_cpu_millicores, 16000);
    }

    #[test]
    fn test_plan_fails_without_schedulable_nodes() {
        let nodes = vec![node("tiny", 100, 1)];
        let result = plan_rollout(
            &nodes,
            &NodeRequirements::default(),
            &[],
            &TuningTables::default(),
        );

        match result {
            Err(Error::NoCompatibleNodes { report }) => {
                assert_eq!(report.total_nodes(), 1);
                assert_eq!(report.incompatible_nodes[0].node.name, "tiny");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
