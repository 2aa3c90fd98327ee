//! Error types for plant construction.
//!
//! The running loop reports plant conditions through the fault manager, not
//! through these errors; they only arise when building components.

use ft_config::ValidationError;
use ft_controls::ControlError;
use ft_core::error::FtError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PlantError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid profile: {message}")]
    Profile { message: String },

    #[error("Control primitive error: {0}")]
    Control(#[from] ControlError),

    #[error("Numeric error: {0}")]
    Numeric(#[from] FtError),
}

pub type PlantResult<T> = Result<T, PlantError>;

impl From<ValidationError> for PlantError {
    fn from(e: ValidationError) -> Self {
        PlantError::Profile {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PlantError::InvalidArg { what: "module_count" };
        assert!(err.to_string().contains("module_count"));
    }

    #[test]
    fn error_conversion() {
        let err: PlantError = FtError::InvalidArg { what: "x" }.into();
        assert!(matches!(err, PlantError::Numeric(_)));
    }
}
