//! Read-only views of the cluster consumed by the core
//!
//! Implementations live at the boundary (the CLI wires a Kubernetes-backed
//! collector); the core only ever sees plain [`NodeFact`] records and counts.

use crate::models::NodeFact;
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a collaborator
#[derive(Debug, Clone, Error)]
pub enum CollectorError {
    /// The cluster API call failed
    #[error("cluster api error: {0}")]
    Api(String),

    /// The response could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),

    /// An endpoint could not be reached
    #[error("unreachable: {0}")]
    Unreachable(String),
}

impl CollectorError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }
}

/// Annotation a pod must carry to count as the expected version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionAnnotation {
    pub key: String,
    pub value: String,
}

impl VersionAnnotation {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Supplier of cluster facts
#[async_trait]
pub trait FactCollector: Send + Sync {
    /// Snapshot every node in the cluster
    async fn list_nodes(&self) -> Result<Vec<NodeFact>, CollectorError>;

    /// Count running pods matching a label selector, optionally pinned to a version
    async fn count_running_pods(
        &self,
        namespace: &str,
        label_selector: &str,
        version: Option<&VersionAnnotation>,
    ) -> Result<usize, CollectorError>;

    /// Count bound persistent volume claims matching a label selector
    async fn count_bound_volume_claims(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<usize, CollectorError>;
}

/// Single connectivity check against a deployed endpoint
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Human-readable target, used in status lines
    fn target(&self) -> &str;

    /// `Ok` once the endpoint answers
    async fn check(&self) -> Result<(), CollectorError>;
}
