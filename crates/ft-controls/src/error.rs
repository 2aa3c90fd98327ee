//! Error types for control primitives.

use thiserror::Error;

/// Result type for control primitive construction.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur when building control primitives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
