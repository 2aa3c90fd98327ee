//! Error types for scheduling and simulation.

use thiserror::Error;

/// Errors from setting up or running the control loop.
///
/// Plant conditions never surface here; they are reported through the
/// system status and the log.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid injection '{spec}': {reason}")]
    Injection { spec: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Plant error: {message}")]
    Plant { message: String },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<ft_config::ConfigError> for SimError {
    fn from(e: ft_config::ConfigError) -> Self {
        SimError::Config {
            message: e.to_string(),
        }
    }
}

impl From<ft_plant::PlantError> for SimError {
    fn from(e: ft_plant::PlantError) -> Self {
        SimError::Plant {
            message: e.to_string(),
        }
    }
}

impl From<ft_core::FtError> for SimError {
    fn from(e: ft_core::FtError) -> Self {
        SimError::Plant {
            message: e.to_string(),
        }
    }
}
