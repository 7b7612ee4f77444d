//! Experiment error types

use thiserror::Error;

/// Errors surfaced to callers of the experiment manager.
///
/// These are the only fatal failures in the engine; everything else
/// degrades.
#[derive(Debug, Error, PartialEq)]
pub enum ExperimentError {
    #[error("Experiment '{experiment}' allocations sum to {total}, expected 100")]
    AllocationMismatch { experiment: String, total: f64 },

    #[error("Experiment '{experiment}' variant '{variant}' has invalid allocation {allocation}")]
    InvalidAllocation {
        experiment: String,
        variant: String,
        allocation: f64,
    },

    #[error("Experiment '{0}' has no variants")]
    NoVariants(String),

    #[error("Experiment '{experiment}' declares variant '{variant}' more than once")]
    DuplicateVariant { experiment: String, variant: String },

    #[error("Unknown experiment: {0}")]
    UnknownExperiment(String),

    #[error("Experiment '{experiment}' has no variant '{variant}'")]
    UnknownVariant { experiment: String, variant: String },
}
