//! Strongly-typed configuration overlays
//!
//! Each preset resolves to an ordered list of patches. Overlays merge in
//! order with last-overlay-wins per key path; writing a path also drops any
//! earlier value at an ancestor or descendant path.

use super::presets::{
    ResourcePreset, AGENT_LOW_RESOURCES, AGENT_MEDIUM_RESOURCES, BACKEND_HIGH_RESOURCES,
    BACKEND_LOW_RESOURCES, BACKEND_MEDIUM_RESOURCES,
};
use crate::models::{GIB, MIB};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Dotted key path into the values document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn parse(dotted: &str) -> Self {
        Self(
            dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    fn overlaps(&self, other: &KeyPath) -> bool {
        let shared = self.0.len().min(other.0.len());
        self.0[..shared] == other.0[..shared]
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Typed value a patch writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PatchValue {
    Cpu(u64),
    Memory(u64),
    Replicas(u32),
    Flag(bool),
    Text(String),
}

impl PatchValue {
    /// Render into the installer's values shape (quantities as strings)
    pub fn to_value(&self) -> Value {
        match self {
            PatchValue::Cpu(millicores) => Value::String(format!("{}m", millicores)),
            PatchValue::Memory(bytes) => Value::String(format_memory_quantity(*bytes)),
            PatchValue::Replicas(count) => Value::from(*count),
            PatchValue::Flag(flag) => Value::Bool(*flag),
            PatchValue::Text(text) => Value::String(text.clone()),
        }
    }
}

fn format_memory_quantity(bytes: u64) -> String {
    if bytes % GIB == 0 {
        format!("{}Gi", bytes / GIB)
    } else if bytes % MIB == 0 {
        format!("{}Mi", bytes / MIB)
    } else {
        bytes.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub path: KeyPath,
    pub value: PatchValue,
}

impl Patch {
    pub fn new(path: &str, value: PatchValue) -> Self {
        Self {
            path: KeyPath::parse(path),
            value,
        }
    }
}

/// Named, ordered list of patches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    pub name: String,
    pub patches: Vec<Patch>,
}

impl Overlay {
    /// Built-in overlay for a preset, `None` for identifiers outside the catalog
    pub fn for_preset(preset: &ResourcePreset) -> Option<Self> {
        let patches = match preset.as_str() {
            AGENT_LOW_RESOURCES => component_resources("agent", 100, 128 * MIB, 500, 512 * MIB),
            AGENT_MEDIUM_RESOURCES => component_resources("agent", 200, 256 * MIB, 1000, GIB),
            BACKEND_LOW_RESOURCES => backend_resources(1, 500, GIB, 2000, 4 * GIB),
            BACKEND_MEDIUM_RESOURCES => backend_resources(1, 1000, 2 * GIB, 4000, 8 * GIB),
            BACKEND_HIGH_RESOURCES => backend_resources(2, 2000, 4 * GIB, 8000, 16 * GIB),
            _ => return None,
        };

        let mut patches = patches;
        patches.push(Patch::new(
            "global.sizingPreset",
            PatchValue::Text(preset.as_str().to_string()),
        ));

        Some(Self {
            name: preset.as_str().to_string(),
            patches,
        })
    }
}

fn component_resources(
    component: &str,
    cpu_request: u64,
    memory_request: u64,
    cpu_limit: u64,
    memory_limit: u64,
) -> Vec<Patch> {
    vec![
        Patch::new(
            &format!("{}.resources.requests.cpu", component),
            PatchValue::Cpu(cpu_request),
        ),
        Patch::new(
            &format!("{}.resources.requests.memory", component),
            PatchValue::Memory(memory_request),
        ),
        Patch::new(
            &format!("{}.resources.limits.cpu", component),
            PatchValue::Cpu(cpu_limit),
        ),
        Patch::new(
            &format!("{}.resources.limits.memory", component),
            PatchValue::Memory(memory_limit),
        ),
    ]
}

fn backend_resources(
    replicas: u32,
    cpu_request: u64,
    memory_request: u64,
    cpu_limit: u64,
    memory_limit: u64,
) -> Vec<Patch> {
    let mut patches = vec![
        Patch::new("backend.replicas", PatchValue::Replicas(replicas)),
        Patch::new("backend.highAvailability", PatchValue::Flag(replicas > 1)),
    ];
    patches.extend(component_resources(
        "backend",
        cpu_request,
        memory_request,
        cpu_limit,
        memory_limit,
    ));
    patches
}

/// Flattened result of merging overlays, in write order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedValues {
    pub entries: Vec<Patch>,
}

impl MergedValues {
    pub fn get(&self, path: &str) -> Option<&PatchValue> {
        let path = KeyPath::parse(path);
        self.entries
            .iter()
            .find(|p| p.path == path)
            .map(|p| &p.value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn apply(&mut self, patch: &Patch) {
        self.entries.retain(|existing| !existing.path.overlaps(&patch.path));
        self.entries.push(patch.clone());
    }

    /// Nested values document for the installer
    pub fn to_values(&self) -> Value {
        let mut root = Map::new();

        'patches: for patch in &self.entries {
            let segments = patch.path.segments();
            let Some((leaf, parents)) = segments.split_last() else {
                continue;
            };

            // apply() drops overlapping paths, so a parent is never a scalar
            let mut cursor = &mut root;
            for segment in parents {
                cursor = match cursor
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new()))
                {
                    Value::Object(map) => map,
                    _ => continue 'patches,
                };
            }
            cursor.insert(leaf.clone(), patch.value.to_value());
        }

        Value::Object(root)
    }
}

/// Merge overlays in order; later overlays win per key path
pub fn merge_overlays(overlays: &[Overlay]) -> MergedValues {
    let mut merged = MergedValues::default();
    for overlay in overlays {
        for patch in &overlay.patches {
            merged.apply(patch);
        }
    }
    merged
}

/// Resolve presets to overlays, skipping identifiers outside the catalog
pub fn overlays_for(presets: &[ResourcePreset]) -> Vec<Overlay> {
    presets.iter().filter_map(Overlay::for_preset).collect()
}
