//! Compatibility report types

use super::requirements::Dimension;
use crate::models::NodeFact;
use serde::{Deserialize, Serialize};

/// Verdict for one requirement across the node set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every node passed (also the vacuous 0/0 case)
    Compatible,
    /// Some but not all nodes passed
    PartiallyCompatible,
    /// No node passed
    Incompatible,
}

impl Verdict {
    pub fn from_counts(passed: usize, total: usize) -> Self {
        if passed == total {
            Verdict::Compatible
        } else if passed == 0 {
            Verdict::Incompatible
        } else {
            Verdict::PartiallyCompatible
        }
    }
}

/// Outcome of one requirement dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub dimension: Dimension,
    pub verdict: Verdict,
    /// Summary such as "Kernel version (2/3 Nodes)"
    pub message: String,
    /// One "node: <name> - <reason>" line per failing node, in input order
    pub error_messages: Vec<String>,
    pub passed: usize,
    pub total: usize,
}

impl Requirement {
    pub(crate) fn new(
        dimension: Dimension,
        passed: usize,
        total: usize,
        error_messages: Vec<String>,
    ) -> Self {
        Self {
            dimension,
            verdict: Verdict::from_counts(passed, total),
            message: format!("{} ({}/{} Nodes)", dimension.title(), passed, total),
            error_messages,
            passed,
            total,
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.verdict == Verdict::Compatible
    }

    pub fn is_non_compatible(&self) -> bool {
        self.verdict == Verdict::Incompatible
    }
}

/// A node that failed at least one requirement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompatibleNode {
    pub node: NodeFact,
    pub errors: Vec<String>,
}

/// Result of validating a node set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub compatible_nodes: Vec<NodeFact>,
    pub incompatible_nodes: Vec<IncompatibleNode>,
    /// Nodes whose only defect is a blocking taint; also present in `incompatible_nodes`
    pub tainted_nodes: Vec<NodeFact>,
    /// One entry per [`Dimension`], in [`Dimension::ALL`] order
    pub requirements: Vec<Requirement>,
}

impl CompatibilityReport {
    /// Requirement outcome for a dimension, if the report carries one
    pub fn requirement(&self, dimension: Dimension) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.dimension == dimension)
    }

    pub fn total_nodes(&self) -> usize {
        self.compatible_nodes.len() + self.incompatible_nodes.len()
    }

    pub fn has_compatible_nodes(&self) -> bool {
        !self.compatible_nodes.is_empty()
    }

    pub fn compatible_node_names(&self) -> Vec<&str> {
        self.compatible_nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn incompatible_node_names(&self) -> Vec<&str> {
        self.incompatible_nodes
            .iter()
            .map(|n| n.node.name.as_str())
            .collect()
    }

    pub fn tainted_node_names(&self) -> Vec<&str> {
        self.tainted_nodes.iter().map(|n| n.name.as_str()).collect()
    }
}
