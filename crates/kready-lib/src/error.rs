//! Error types for the readiness core

use crate::validation::CompatibilityReport;
use thiserror::Error;

/// Result alias for fallible core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the core outside of polling
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A toleration string could not be parsed
    #[error("invalid toleration '{input}': {reason}")]
    InvalidToleration { input: String, reason: String },

    /// A resource quantity string could not be parsed
    #[error("invalid quantity '{0}'")]
    InvalidQuantity(String),

    /// Tuning was asked to size an empty node set
    #[error("no allocatable nodes to size resources from")]
    NoAllocatableNodes,

    /// Not a single node can take the workload; carries the report explaining why
    #[error("no compatible nodes found ({} nodes inspected)", .report.total_nodes())]
    NoCompatibleNodes { report: Box<CompatibilityReport> },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a toleration parse error
    pub fn invalid_toleration(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidToleration {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
