//! Error types for routing inputs

use thiserror::Error;

/// Errors raised while interpreting caller-supplied routing inputs.
///
/// Irregular catalog, quota or telemetry data never produce an error; plan
/// building degrades instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// A preference or override named a role outside the fixed set
    #[error("Unknown agent role '{role}'")]
    UnknownRole { role: String },
}
