//! Readiness core for cluster deployments
//!
//! This crate provides the core functionality for:
//! - Node compatibility validation against a fixed requirement set
//! - Resource preset tuning from aggregate cluster capacity
//! - Taint/toleration reconciliation for tainted-but-compatible nodes
//! - Bounded asynchronous polling
//! - Rollout convergence waiters built on the poll engine
//!
//! Cluster access is abstracted behind the traits in [`collector`]; this crate
//! never talks to a cluster API directly.

pub mod collector;
pub mod convergence;
pub mod error;
pub mod models;
pub mod plan;
pub mod poll;
pub mod tolerations;
pub mod tuning;
pub mod validation;

pub use collector::{CollectorError, ConnectivityProbe, FactCollector, VersionAnnotation};
pub use error::{Error, Result};
pub use models::*;
pub use plan::{plan_rollout, RolloutPlan};
pub use validation::{validate, CompatibilityReport, Dimension, NodeRequirements, Requirement};
