//! Requirement dimensions and the per-node predicates behind them

use crate::models::{NodeFact, GIB, MIB};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Default minimum allocatable CPU per node
pub const MIN_CPU_MILLICORES: u64 = 1750;

/// Default minimum allocatable memory per node
pub const MIN_MEMORY_BYTES: u64 = 1750 * MIB;

/// Provider reported for nodes without a provider ID
pub const ON_PREM_PROVIDER: &str = "on-prem";

/// One compatibility dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Cpu,
    Memory,
    Kernel,
    Architecture,
    OperatingSystem,
    Provider,
    Schedulable,
}

impl Dimension {
    /// Every dimension, in report order
    pub const ALL: [Dimension; 7] = [
        Dimension::Cpu,
        Dimension::Memory,
        Dimension::Kernel,
        Dimension::Architecture,
        Dimension::OperatingSystem,
        Dimension::Provider,
        Dimension::Schedulable,
    ];

    /// Human-readable title used in requirement messages
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Cpu => "Sufficient node CPU",
            Dimension::Memory => "Sufficient node memory",
            Dimension::Kernel => "Kernel version",
            Dimension::Architecture => "CPU architecture",
            Dimension::OperatingSystem => "Operating system",
            Dimension::Provider => "Cloud provider",
            Dimension::Schedulable => "Node schedulable",
        }
    }
}

/// Kernel release reduced to its comparable numeric prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl KernelVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a kernel release such as `5.15.0-1034-aws` or `4.14.326-245.539.amzn2.x86_64`
    pub fn parse(release: &str) -> Option<Self> {
        static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            regex::Regex::new(r"^\s*(\d+)\.(\d+)(?:\.(\d+))?").expect("static regex is valid")
        });

        let captures = pattern.captures(release)?;
        let major = captures.get(1)?.as_str().parse().ok()?;
        let minor = captures.get(2)?.as_str().parse().ok()?;
        let patch = captures
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);

        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Thresholds and allow-lists a node is checked against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRequirements {
    pub min_cpu_millicores: u64,
    pub min_memory_bytes: u64,
    pub min_kernel: KernelVersion,
    pub architectures: Vec<String>,
    pub operating_systems: Vec<String>,
    pub providers: Vec<String>,
}

impl Default for NodeRequirements {
    fn default() -> Self {
        Self {
            min_cpu_millicores: MIN_CPU_MILLICORES,
            min_memory_bytes: MIN_MEMORY_BYTES,
            min_kernel: KernelVersion::new(4, 14, 0),
            architectures: to_strings(&["amd64", "arm64"]),
            operating_systems: to_strings(&["linux"]),
            providers: to_strings(&[
                "aws",
                "gce",
                "azure",
                "digitalocean",
                "linode",
                "oci",
                "ibm",
                "vsphere",
                "openstack",
                "kind",
                "k3s",
                ON_PREM_PROVIDER,
            ]),
        }
    }
}

impl NodeRequirements {
    /// Check one node against one dimension; `Err` carries the failure reason
    pub fn check(&self, dimension: Dimension, node: &NodeFact) -> Result<(), String> {
        match dimension {
            Dimension::Cpu => {
                if node.cpu_millicores >= self.min_cpu_millicores {
                    Ok(())
                } else {
                    Err(format!(
                        "insufficient cpu ({}m < {}m)",
                        node.cpu_millicores, self.min_cpu_millicores
                    ))
                }
            }
            Dimension::Memory => {
                if node.memory_bytes >= self.min_memory_bytes {
                    Ok(())
                } else {
                    Err(format!(
                        "insufficient memory ({} < {})",
                        format_memory(node.memory_bytes),
                        format_memory(self.min_memory_bytes)
                    ))
                }
            }
            Dimension::Kernel => match KernelVersion::parse(&node.kernel_version) {
                Some(version) if version >= self.min_kernel => Ok(()),
                Some(_) => Err(format!(
                    "kernel version {} is not supported (minimum {}.{})",
                    node.kernel_version, self.min_kernel.major, self.min_kernel.minor
                )),
                None => Err(format!(
                    "unparsable kernel version '{}'",
                    node.kernel_version
                )),
            },
            Dimension::Architecture => {
                allowed(&self.architectures, &node.architecture, "architecture")
            }
            Dimension::OperatingSystem => allowed(
                &self.operating_systems,
                &node.operating_system,
                "operating system",
            ),
            Dimension::Provider => allowed(&self.providers, &provider_of(node), "provider"),
            Dimension::Schedulable => {
                let taints: Vec<String> = node.blocking_taints().map(|t| t.to_string()).collect();
                if taints.is_empty() {
                    Ok(())
                } else {
                    Err(format!("node is tainted ({})", taints.join(", ")))
                }
            }
        }
    }
}

/// Provider name derived from a node's provider ID
///
/// `aws:///us-east-1a/i-0abc` yields `aws`, an empty ID yields `on-prem`.
/// EKS Fargate nodes share the `aws` scheme and are told apart by name.
pub fn provider_of(node: &NodeFact) -> String {
    if node.name.starts_with("fargate-") {
        return "fargate".to_string();
    }

    let id = node.provider_id.trim();
    if id.is_empty() {
        return ON_PREM_PROVIDER.to_string();
    }

    id.split("://")
        .next()
        .unwrap_or(id)
        .to_ascii_lowercase()
}

fn allowed(allow_list: &[String], value: &str, what: &str) -> Result<(), String> {
    if allow_list.iter().any(|a| a.eq_ignore_ascii_case(value)) {
        Ok(())
    } else {
        Err(format!("{} {} is not supported", what, display_value(value)))
    }
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "<unknown>"
    } else {
        value
    }
}

fn format_memory(bytes: u64) -> String {
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{}Gi", bytes / GIB)
    } else {
        format!("{}Mi", bytes / MIB)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
