//! Kubernetes-backed fact collector

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use kready_lib::models::{parse_cpu_millicores, parse_memory_bytes, NodeFact, Taint, TaintEffect};
use kready_lib::{CollectorError, FactCollector, VersionAnnotation};
use std::collections::BTreeMap;
use std::path::Path;

/// Create a kube client from an optional kubeconfig path
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Failed to load kubeconfig")?
        }
        None => Config::infer().await.context("Failed to infer cluster config")?,
    };

    Client::try_from(config).context("Failed to create cluster client")
}

/// Read-only collector over the cluster API
pub struct KubeCollector {
    client: Client,
}

impl KubeCollector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FactCollector for KubeCollector {
    async fn list_nodes(&self) -> Result<Vec<NodeFact>, CollectorError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| CollectorError::api(format!("failed to list nodes: {}", e)))?;

        list.items.iter().map(node_fact).collect()
    }

    async fn count_running_pods(
        &self,
        namespace: &str,
        label_selector: &str,
        version: Option<&VersionAnnotation>,
    ) -> Result<usize, CollectorError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| CollectorError::api(format!("failed to list pods: {}", e)))?;

        Ok(list
            .items
            .iter()
            .filter(|pod| pod_is_running(pod, version))
            .count())
    }

    async fn count_bound_volume_claims(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<usize, CollectorError> {
        let claims: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let list = claims
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| {
                CollectorError::api(format!("failed to list persistent volume claims: {}", e))
            })?;

        Ok(list
            .items
            .iter()
            .filter(|claim| {
                claim.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Bound")
            })
            .count())
    }
}

/// Convert a node object into the facts the validator reads
pub fn node_fact(node: &Node) -> Result<NodeFact, CollectorError> {
    let name = node.metadata.name.clone().unwrap_or_default();
    let status = node.status.as_ref();

    let resources = status
        .and_then(|s| s.allocatable.as_ref())
        .or_else(|| status.and_then(|s| s.capacity.as_ref()));

    let cpu_millicores = quantity(resources, "cpu", &name, parse_cpu_millicores)?;
    let memory_bytes = quantity(resources, "memory", &name, parse_memory_bytes)?;

    let mut fact = NodeFact::new(name)
        .with_cpu(cpu_millicores)
        .with_memory(memory_bytes);

    // A node that has not reported system info yet is unknown, not amd64/linux
    fact = match status.and_then(|s| s.node_info.as_ref()) {
        Some(info) => fact
            .with_architecture(info.architecture.clone())
            .with_os(info.operating_system.clone())
            .with_kernel(info.kernel_version.clone()),
        None => fact.with_architecture("").with_os(""),
    };

    if let Some(spec) = node.spec.as_ref() {
        if let Some(provider_id) = spec.provider_id.as_ref() {
            fact = fact.with_provider_id(provider_id.clone());
        }
        for taint in spec.taints.iter().flatten() {
            let effect = taint.effect.parse::<TaintEffect>().map_err(|_| {
                CollectorError::malformed(format!(
                    "node {} has unknown taint effect '{}'",
                    fact.name, taint.effect
                ))
            })?;
            fact = fact.with_taint(Taint::new(
                taint.key.clone(),
                taint.value.clone().unwrap_or_default(),
                effect,
            ));
        }
    }

    Ok(fact)
}

fn quantity(
    resources: Option<&BTreeMap<String, Quantity>>,
    resource: &str,
    node: &str,
    parse: fn(&str) -> kready_lib::Result<u64>,
) -> Result<u64, CollectorError> {
    match resources.and_then(|r| r.get(resource)) {
        Some(Quantity(value)) => parse(value).map_err(|e| {
            CollectorError::malformed(format!("node {} reports {} {}: {}", node, resource, value, e))
        }),
        None => Ok(0),
    }
}

fn pod_is_running(pod: &Pod, version: Option<&VersionAnnotation>) -> bool {
    let running = pod.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running");
    let matches_version = version.map_or(true, |v| {
        pod.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(&v.key))
            == Some(&v.value)
    });
    running && matches_version
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeSpec, NodeStatus, NodeSystemInfo, PodStatus};
    use kready_lib::models::GIB;
    use kready_lib::validation::{Dimension, NodeRequirements};

    fn resources(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(memory.to_string())),
        ])
    }

    fn node(allocatable: Option<BTreeMap<String, Quantity>>) -> Node {
        let mut node = Node::default();
        node.metadata.name = Some("worker-1".to_string());
        node.spec = Some(NodeSpec {
            provider_id: Some("aws:///us-east-1a/i-0abc".to_string()),
            taints: Some(vec![k8s_openapi::api::core::v1::Taint {
                key: "dedicated".to_string(),
                value: Some("infra".to_string()),
                effect: "NoSchedule".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        });
        node.status = Some(NodeStatus {
            allocatable,
            capacity: Some(resources("8", "32Gi")),
            node_info: Some(NodeSystemInfo {
                architecture: "arm64".to_string(),
                operating_system: "linux".to_string(),
                kernel_version: "5.15.0-1019-aws".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        node
    }

    #[test]
    fn test_node_fact_reads_allocatable() {
        let fact = node_fact(&node(Some(resources("3920m", "15Gi")))).unwrap();

        assert_eq!(fact.name, "worker-1");
        assert_eq!(fact.cpu_millicores, 3920);
        assert_eq!(fact.memory_bytes, 15 * GIB);
        assert_eq!(fact.architecture, "arm64");
        assert_eq!(fact.kernel_version, "5.15.0-1019-aws");
        assert_eq!(fact.provider_id, "aws:///us-east-1a/i-0abc");
        assert_eq!(
            fact.taints,
            vec![Taint::new("dedicated", "infra", TaintEffect::NoSchedule)]
        );
    }

    #[test]
    fn test_node_fact_falls_back_to_capacity() {
        let fact = node_fact(&node(None)).unwrap();
        assert_eq!(fact.cpu_millicores, 8000);
        assert_eq!(fact.memory_bytes, 32 * GIB);
    }

    #[test]
    fn test_node_fact_without_system_info_is_unknown() {
        let mut node = node(None);
        if let Some(status) = node.status.as_mut() {
            status.node_info = None;
        }

        let fact = node_fact(&node).unwrap();
        assert_eq!(fact.architecture, "");
        assert_eq!(fact.operating_system, "");

        let requirements = NodeRequirements::default();
        let error = requirements
            .check(Dimension::Architecture, &fact)
            .unwrap_err();
        assert!(error.contains("<unknown>"), "got: {}", error);
        assert!(requirements
            .check(Dimension::OperatingSystem, &fact)
            .is_err());
    }

    #[test]
    fn test_node_fact_rejects_bad_quantity() {
        let result = node_fact(&node(Some(resources("lots", "1Gi"))));
        assert!(matches!(result, Err(CollectorError::Malformed(_))));
    }

    #[test]
    fn test_pod_version_filter() {
        let mut pod = Pod::default();
        pod.status = Some(PodStatus {
            phase: Some("Running".to_string()),
            ..Default::default()
        });
        pod.metadata.annotations = Some(BTreeMap::from([(
            "kready.io/version".to_string(),
            "1.2.0".to_string(),
        )]));

        assert!(pod_is_running(&pod, None));
        assert!(pod_is_running(
            &pod,
            Some(&VersionAnnotation::new("kready.io/version", "1.2.0"))
        ));
        assert!(!pod_is_running(
            &pod,
            Some(&VersionAnnotation::new("kready.io/version", "1.1.0"))
        ));
    }
}
