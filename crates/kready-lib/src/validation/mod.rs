//! Node compatibility validation
//!
//! Every node is scored against each [`Dimension`] independently. A node
//! that fails any dimension is incompatible; when the only failing dimension
//! is schedulability it is additionally recorded as tainted so a later
//! toleration pass can re-admit it.

mod report;
mod requirements;


pub use report::{CompatibilityReport, IncompatibleNode, Requirement, Verdict};
pub use requirements::{
    provider_of, Dimension, KernelVersion, NodeRequirements, MIN_CPU_MILLICORES,
    MIN_MEMORY_BYTES, ON_PREM_PROVIDER,
};

use crate::models::NodeFact;

/// Validate nodes against the default requirement set
pub fn validate(nodes: &[NodeFact]) -> CompatibilityReport {
    validate_with(&NodeRequirements::default(), nodes)
}

/// Validate nodes against a custom requirement set
pub fn validate_with(requirements: &NodeRequirements, nodes: &[NodeFact]) -> CompatibilityReport {
    let mut passed = [0usize; Dimension::ALL.len()];
    let mut errors: [Vec<String>; Dimension::ALL.len()] = Default::default();

    let mut compatible_nodes = Vec::new();
    let mut incompatible_nodes = Vec::new();
    let mut tainted_nodes = Vec::new();

    for node in nodes {
        let mut node_errors = Vec::new();
        let mut failed_hard = false;
        let mut failed_schedulable = false;

        for (index, dimension) in Dimension::ALL.iter().enumerate() {
            match requirements.check(*dimension, node) {
                Ok(()) => passed[index] += 1,
                Err(reason) => {
                    let message = format!("node: {} - {}", node.name, reason);
                    errors[index].push(message.clone());
                    node_errors.push(message);

                    if *dimension == Dimension::Schedulable {
                        failed_schedulable = true;
                    } else {
                        failed_hard = true;
                    }
                }
            }
        }

        if node_errors.is_empty() {
            compatible_nodes.push(node.clone());
            continue;
        }

        if failed_schedulable && !failed_hard {
            tainted_nodes.push(node.clone());
        }
        incompatible_nodes.push(IncompatibleNode {
            node: node.clone(),
            errors: node_errors,
        });
    }

    let requirements = Dimension::ALL
        .iter()
        .zip(passed)
        .zip(errors)
        .map(|((dimension, passed), errors)| {
            Requirement::new(*dimension, passed, nodes.len(), errors)
        })
        .collect();

    CompatibilityReport {
        compatible_nodes,
        incompatible_nodes,
        tainted_nodes,
        requirements,
    }
}
