//! Core data models for readiness validation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const KIB: u64 = 1024;
pub const MIB: u64 = KIB * 1024;
pub const GIB: u64 = MIB * 1024;

/// Point-in-time snapshot of one cluster node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFact {
    pub name: String,
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
    pub architecture: String,
    pub operating_system: String,
    pub kernel_version: String,
    /// Raw provider ID as reported by the node (e.g. `aws:///us-east-1a/i-0abc`)
    pub provider_id: String,
    #[serde(default)]
    pub taints: Vec<Taint>,
}

impl NodeFact {
    /// Create a node fact with typical linux/amd64 attributes and no capacity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpu_millicores: 0,
            memory_bytes: 0,
            architecture: "amd64".to_string(),
            operating_system: "linux".to_string(),
            kernel_version: String::new(),
            provider_id: String::new(),
            taints: Vec::new(),
        }
    }

    pub fn with_cpu(mut self, millicores: u64) -> Self {
        self.cpu_millicores = millicores;
        self
    }

    pub fn with_memory(mut self, bytes: u64) -> Self {
        self.memory_bytes = bytes;
        self
    }

    pub fn with_kernel(mut self, kernel_version: impl Into<String>) -> Self {
        self.kernel_version = kernel_version.into();
        self
    }

    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = architecture.into();
        self
    }

    pub fn with_os(mut self, operating_system: impl Into<String>) -> Self {
        self.operating_system = operating_system.into();
        self
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    pub fn with_taint(mut self, taint: Taint) -> Self {
        self.taints.push(taint);
        self
    }

    /// Taints that keep ordinary workloads off this node
    pub fn blocking_taints(&self) -> impl Iterator<Item = &Taint> {
        self.taints.iter().filter(|t| t.effect.blocks_scheduling())
    }

    /// Returns true if any taint keeps ordinary workloads off this node
    pub fn is_tainted(&self) -> bool {
        self.blocking_taints().next().is_some()
    }
}

/// Scheduling effect of a taint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

impl TaintEffect {
    /// `PreferNoSchedule` is advisory only
    pub fn blocks_scheduling(&self) -> bool {
        matches!(self, TaintEffect::NoSchedule | TaintEffect::NoExecute)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaintEffect::NoSchedule => "NoSchedule",
            TaintEffect::PreferNoSchedule => "PreferNoSchedule",
            TaintEffect::NoExecute => "NoExecute",
        }
    }
}

impl std::str::FromStr for TaintEffect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NoSchedule" => Ok(TaintEffect::NoSchedule),
            "PreferNoSchedule" => Ok(TaintEffect::PreferNoSchedule),
            "NoExecute" => Ok(TaintEffect::NoExecute),
            other => Err(Error::invalid_toleration(
                other,
                "unknown taint effect",
            )),
        }
    }
}

/// Node-side scheduling restriction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub effect: TaintEffect,
}

impl Taint {
    pub fn new(key: impl Into<String>, value: impl Into<String>, effect: TaintEffect) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            effect,
        }
    }
}

impl fmt::Display for Taint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{}:{}", self.key, self.effect.as_str())
        } else {
            write!(f, "{}={}:{}", self.key, self.value, self.effect.as_str())
        }
    }
}

/// Parse a Kubernetes CPU quantity ("250m", "4", "1.5") into millicores
pub fn parse_cpu_millicores(input: &str) -> Result<u64> {
    parse_quantity(input, 1000.0)
}

/// Parse a Kubernetes memory quantity ("16Gi", "16384Mi", "1.5G") into bytes
pub fn parse_memory_bytes(input: &str) -> Result<u64> {
    parse_quantity(input, 1.0)
}

/// Parse a quantity and scale it into the target unit, rounding up fractions
fn parse_quantity(input: &str, unit_scale: f64) -> Result<u64> {
    let invalid = || Error::InvalidQuantity(input.to_string());
    let trimmed = input.trim();

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);
    if number.is_empty() {
        return Err(invalid());
    }
    let base: f64 = number.parse().map_err(|_| invalid())?;

    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => KIB as f64,
        "Mi" => MIB as f64,
        "Gi" => GIB as f64,
        "Ti" => (GIB * KIB) as f64,
        "Pi" => (GIB * MIB) as f64,
        "Ei" => (GIB * GIB) as f64,
        exp if exp.len() > 1 && (exp.starts_with('e') || exp.starts_with('E')) => {
            let power: i32 = exp[1..].parse().map_err(|_| invalid())?;
            10f64.powi(power)
        }
        _ => return Err(invalid()),
    };

    let scaled = base * multiplier * unit_scale;
    if !scaled.is_finite() || scaled < 0.0 {
        return Err(invalid());
    }

    // Absorb float noise ("3920m" * 1e-3 * 1000) before rounding up
    let rounded = scaled.round();
    if (scaled - rounded).abs() < 1e-6 {
        Ok(rounded as u64)
    } else {
        Ok(scaled.ceil() as u64)
    }
}
