//! Taint/toleration reconciliation
//!
//! Derives the minimal toleration set for tainted-but-otherwise-compatible
//! nodes and re-admits nodes whose every blocking taint is tolerated. Only
//! the `Equal` operator is produced or accepted.

use crate::error::{Error, Result};
use crate::models::{NodeFact, Taint, TaintEffect};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Match operator for a toleration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TolerationOperator {
    Equal,
}

/// Workload-side opt-in for one taint
///
/// Field order is part of the serialized string form and must stay fixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Toleration {
    pub key: String,
    pub operator: TolerationOperator,
    pub value: String,
    pub effect: TaintEffect,
}

impl Toleration {
    /// Toleration matching exactly this taint
    pub fn for_taint(taint: &Taint) -> Self {
        Self {
            key: taint.key.clone(),
            operator: TolerationOperator::Equal,
            value: taint.value.clone(),
            effect: taint.effect,
        }
    }

    /// Returns true if this toleration covers the taint
    pub fn tolerates(&self, taint: &Taint) -> bool {
        match self.operator {
            TolerationOperator::Equal => {
                self.key == taint.key && self.value == taint.value && self.effect == taint.effect
            }
        }
    }

    /// Stable string form, e.g. `{"key":"k","operator":"Equal","value":"v","effect":"NoSchedule"}`
    pub fn to_string_form(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the stable string form
    pub fn parse(input: &str) -> Result<Self> {
        serde_json::from_str(input.trim())
            .map_err(|e| Error::invalid_toleration(input, e.to_string()))
    }
}

/// One toleration per distinct blocking taint, in order of first appearance
pub fn derive_tolerations(tainted_nodes: &[NodeFact]) -> Vec<Toleration> {
    let mut seen: HashSet<&Taint> = HashSet::new();
    let mut tolerations = Vec::new();

    for node in tainted_nodes {
        for taint in node.blocking_taints() {
            if seen.insert(taint) {
                tolerations.push(Toleration::for_taint(taint));
            }
        }
    }

    tolerations
}

/// Serialize tolerations to their string form for configuration layers
pub fn serialize_tolerations(tolerations: &[Toleration]) -> Result<Vec<String>> {
    tolerations.iter().map(Toleration::to_string_form).collect()
}

/// Parse a list of serialized tolerations
pub fn parse_tolerations<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Toleration>> {
    inputs.iter().map(|s| Toleration::parse(s.as_ref())).collect()
}

/// Tainted nodes whose every blocking taint has a matching known toleration
pub fn filter_tolerable_nodes(
    tainted_nodes: &[NodeFact],
    known_tolerations: &[Toleration],
) -> Vec<NodeFact> {
    tainted_nodes
        .iter()
        .filter(|node| {
            node.blocking_taints()
                .all(|taint| known_tolerations.iter().any(|t| t.tolerates(taint)))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taint(key: &str, value: &str) -> Taint {
        Taint::new(key, value, TaintEffect::NoSchedule)
    }

    #[test]
    fn test_derive_deduplicates_in_first_seen_order() {
        let nodes = vec![
            NodeFact::new("a").with_taint(taint("x", "1")),
            NodeFact::new("b")
                .with_taint(taint("y", "2"))
                .with_taint(taint("x", "1")),
            NodeFact::new("c").with_taint(taint("x", "other")),
        ];

        let tolerations = derive_tolerations(&nodes);
        let keys: Vec<(&str, &str)> = tolerations
            .iter()
            .map(|t| (t.key.as_str(), t.value.as_str()))
            .collect();
        assert_eq!(keys, vec![("x", "1"), ("y", "2"), ("x", "other")]);
        assert!(tolerations
            .iter()
            .all(|t| t.operator == TolerationOperator::Equal));
    }

    #[test]
    fn test_same_key_different_effect_is_distinct() {
        let nodes = vec![NodeFact::new("a")
            .with_taint(Taint::new("k", "v", TaintEffect::NoSchedule))
            .with_taint(Taint::new("k", "v", TaintEffect::NoExecute))];

        assert_eq!(derive_tolerations(&nodes).len(), 2);
    }

    #[test]
    fn test_advisory_taints_are_ignored() {
        let nodes = vec![NodeFact::new("a")
            .with_taint(Taint::new("spot", "", TaintEffect::PreferNoSchedule))];

        assert!(derive_tolerations(&nodes).is_empty());
    }

    #[test]
    fn test_string_form_round_trip() {
        let original = taint("dedicated", "gpu");
        let nodes = vec![NodeFact::new("a").with_taint(original.clone())];

        let strings = serialize_tolerations(&derive_tolerations(&nodes)).unwrap();
        assert_eq!(
            strings[0],
            r#"{"key":"dedicated","operator":"Equal","value":"gpu","effect":"NoSchedule"}"#
        );

        let parsed = Toleration::parse(&strings[0]).unwrap();
        assert_eq!(parsed, Toleration::for_taint(&original));
        assert!(parsed.tolerates(&original));
    }

    #[test]
    fn test_parse_rejects_unknown_operator_and_effect() {
        assert!(Toleration::parse(
            r#"{"key":"k","operator":"Exists","value":"","effect":"NoSchedule"}"#
        )
        .is_err());
        assert!(Toleration::parse(
            r#"{"key":"k","operator":"Equal","value":"","effect":"Sometimes"}"#
        )
        .is_err());
        assert!(Toleration::parse("not json").is_err());
    }

    #[test]
    fn test_filter_tolerable_nodes() {
        let x = taint("x", "1");
        let y = taint("y", "2");
        let nodes = vec![
            NodeFact::new("A").with_taint(x.clone()),
            NodeFact::new("B").with_taint(y.clone()),
        ];

        let known = vec![Toleration::for_taint(&x)];
        let admitted = filter_tolerable_nodes(&nodes, &known);
        let names: Vec<&str> = admitted.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn test_partial_coverage_excludes_node() {
        let x = taint("x", "1");
        let y = taint("y", "2");
        let nodes = vec![NodeFact::new("AB").with_taint(x.clone()).with_taint(y)];

        let admitted = filter_tolerable_nodes(&nodes, &[Toleration::for_taint(&x)]);
        assert!(admitted.is_empty());
    }

    #[test]
    fn test_parse_tolerations_list() {
        let inputs = vec![
            r#"{"key":"a","operator":"Equal","value":"1","effect":"NoExecute"}"#.to_string(),
        ];
        let parsed = parse_tolerations(&inputs).unwrap();
        assert_eq!(parsed[0].effect, TaintEffect::NoExecute);
    }
}
