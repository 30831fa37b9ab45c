//! Threshold tables and preset selection

use super::allocatable::{AllocatableResources, ResourceMeasure};
use crate::models::GIB;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const AGENT_LOW_RESOURCES: &str = "presets/agent/low-resources";
pub const AGENT_MEDIUM_RESOURCES: &str = "presets/agent/medium-resources";
pub const BACKEND_LOW_RESOURCES: &str = "presets/backend/low-resources";
pub const BACKEND_MEDIUM_RESOURCES: &str = "presets/backend/medium-resources";
pub const BACKEND_HIGH_RESOURCES: &str = "presets/backend/high-resources";

/// Opaque overlay identifier selected by the tuner
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePreset(String);

impl ResourcePreset {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourcePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tier: fires when either measurement is strictly below its bound
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetTier {
    pub preset: ResourcePreset,
    pub cpu_below_millicores: u64,
    pub memory_below_bytes: u64,
}

impl PresetTier {
    pub fn new(preset: &str, cpu_below_millicores: u64, memory_below_bytes: u64) -> Self {
        Self {
            preset: ResourcePreset::new(preset),
            cpu_below_millicores,
            memory_below_bytes,
        }
    }

    fn matches(&self, measure: &ResourceMeasure) -> bool {
        measure.cpu_millicores < self.cpu_below_millicores
            || measure.memory_bytes < self.memory_below_bytes
    }
}

/// Tiers ordered from most to least constrained, bounds ascending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub tiers: Vec<PresetTier>,
}

impl ThresholdTable {
    /// Per-node agent sizing, keyed on the smallest node
    pub fn agent() -> Self {
        Self {
            tiers: vec![
                PresetTier::new(AGENT_LOW_RESOURCES, 3000, 6 * GIB),
                PresetTier::new(AGENT_MEDIUM_RESOURCES, 6000, 12 * GIB),
            ],
        }
    }

    /// Cluster-wide backend sizing, keyed on totals
    pub fn backend() -> Self {
        Self {
            tiers: vec![
                PresetTier::new(BACKEND_LOW_RESOURCES, 12000, 24 * GIB),
                PresetTier::new(BACKEND_MEDIUM_RESOURCES, 24000, 48 * GIB),
                PresetTier::new(BACKEND_HIGH_RESOURCES, 48000, 96 * GIB),
            ],
        }
    }
}

/// Both tuning axes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningTables {
    pub agent: ThresholdTable,
    pub backend: ThresholdTable,
}

impl Default for TuningTables {
    fn default() -> Self {
        Self {
            agent: ThresholdTable::agent(),
            backend: ThresholdTable::backend(),
        }
    }
}

/// First tier the measure falls below, or `None` when defaults suffice
pub fn select_preset(measure: ResourceMeasure, table: &ThresholdTable) -> Option<ResourcePreset> {
    table
        .tiers
        .iter()
        .find(|tier| tier.matches(&measure))
        .map(|tier| tier.preset.clone())
}

/// Presets for both axes, agent first so backend keys win when merged
pub fn tune(resources: &AllocatableResources, tables: &TuningTables) -> Vec<ResourcePreset> {
    [
        select_preset(resources.per_node(), &tables.agent),
        select_preset(resources.cluster_wide(), &tables.backend),
    ]
    .into_iter()
    .flatten()
    .collect()
}
