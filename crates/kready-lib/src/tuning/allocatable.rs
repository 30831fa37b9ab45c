//! Aggregate allocatable capacity over a node set

use crate::error::{Error, Result};
use crate::models::NodeFact;
use serde::{Deserialize, Serialize};

/// Capacity figures the tuner sizes presets from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatableResources {
    /// Tightest single-node CPU
    pub min_cpu_millicores: u64,
    /// Tightest single-node memory
    pub min_memory_bytes: u64,
    pub total_cpu_millicores: u64,
    pub total_memory_bytes: u64,
}

/// CPU and memory pair fed into a threshold table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeasure {
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}

impl AllocatableResources {
    /// Per-node measure, sizes the agent that runs on every node
    pub fn per_node(&self) -> ResourceMeasure {
        ResourceMeasure {
            cpu_millicores: self.min_cpu_millicores,
            memory_bytes: self.min_memory_bytes,
        }
    }

    /// Cluster-wide measure, sizes the backend
    pub fn cluster_wide(&self) -> ResourceMeasure {
        ResourceMeasure {
            cpu_millicores: self.total_cpu_millicores,
            memory_bytes: self.total_memory_bytes,
        }
    }
}

/// Fold allocatable capacity over the nodes ordinary workloads can land on
///
/// Nodes with blocking taints are skipped. Fails when nothing is left.
pub fn calc_allocatable_resources(nodes: &[NodeFact]) -> Result<AllocatableResources> {
    nodes
        .iter()
        .filter(|node| !node.is_tainted())
        .fold(None, |acc: Option<AllocatableResources>, node| {
            Some(match acc {
                None => AllocatableResources {
                    min_cpu_millicores: node.cpu_millicores,
                    min_memory_bytes: node.memory_bytes,
                    total_cpu_millicores: node.cpu_millicores,
                    total_memory_bytes: node.memory_bytes,
                },
                Some(acc) => AllocatableResources {
                    min_cpu_millicores: acc.min_cpu_millicores.min(node.cpu_millicores),
                    min_memory_bytes: acc.min_memory_bytes.min(node.memory_bytes),
                    total_cpu_millicores: acc.total_cpu_millicores.saturating_add(node.cpu_millicores),
                    total_memory_bytes: acc.total_memory_bytes.saturating_add(node.memory_bytes),
                },
            })
        })
        .ok_or(Error::NoAllocatableNodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Taint, TaintEffect, GIB};

    fn node(name: &str, cpu: u64, memory_gib: u64) -> NodeFact {
        NodeFact::new(name).with_cpu(cpu).with_memory(memory_gib * GIB)
    }

    #[test]
    fn test_min_and_totals() {
        let nodes = vec![node("a", 4000, 16), node("b", 2000, 32), node("c", 8000, 8)];
        let resources = calc_allocatable_resources(&nodes).unwrap();

        assert_eq!(resources.min_cpu_millicores, 2000);
        assert_eq!(resources.min_memory_bytes, 8 * GIB);
        assert_eq!(resources.total_cpu_millicores, 14000);
        assert_eq!(resources.total_memory_bytes, 56 * GIB);
    }

    #[test]
    fn test_order_independent() {
        let nodes = vec![node("a", 4000, 16), node("b", 2000, 32), node("c", 8000, 8)];
        let expected = calc_allocatable_resources(&nodes).unwrap();

        let permutations = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in permutations {
            let permuted: Vec<NodeFact> = order.iter().map(|&i| nodes[i].clone()).collect();
            assert_eq!(calc_allocatable_resources(&permuted).unwrap(), expected);
        }
    }

    #[test]
    fn test_tainted_nodes_are_excluded() {
        let nodes = vec![
            node("a", 4000, 16),
            node("cp", 500, 1).with_taint(Taint::new(
                "node-role.kubernetes.io/control-plane",
                "",
                TaintEffect::NoSchedule,
            )),
        ];
        let resources = calc_allocatable_resources(&nodes).unwrap();

        assert_eq!(resources.min_cpu_millicores, 4000);
        assert_eq!(resources.total_cpu_millicores, 4000);
    }

    #[test]
    fn test_empty_effective_set_is_an_error() {
        let nodes = vec![node("a", 4000, 16).with_taint(Taint::new("k", "v", TaintEffect::NoExecute))];

        assert!(matches!(
            calc_allocatable_resources(&nodes),
            Err(Error::NoAllocatableNodes)
        ));
        assert!(calc_allocatable_resources(&[]).is_err());
    }
}
