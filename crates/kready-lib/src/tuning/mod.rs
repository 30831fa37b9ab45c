//! Resource preset tuning
//!
//! Sizes the workload to the cluster it lands on: aggregate capacity is
//! folded from the schedulable nodes, each of two threshold tables picks at
//! most one preset, and the presets resolve to typed overlays merged in
//! order (agent first, backend second).

mod allocatable;
mod overlay;
mod presets;

pub use allocatable::{calc_allocatable_resources, AllocatableResources, ResourceMeasure};
pub use overlay::{merge_overlays, overlays_for, KeyPath, MergedValues, Overlay, Patch, PatchValue};
pub use presets::{
    select_preset, tune, PresetTier, ResourcePreset, ThresholdTable, TuningTables,
    AGENT_LOW_RESOURCES, AGENT_MEDIUM_RESOURCES, BACKEND_HIGH_RESOURCES, BACKEND_LOW_RESOURCES,
    BACKEND_MEDIUM_RESOURCES,
};
