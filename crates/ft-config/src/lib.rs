//! ft-config: hardware profile format, validation and built-in presets.

pub mod presets;
pub mod schema;
pub mod validate;

pub use presets::{PRESET_NAMES, preset};
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_profile};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown preset: {name}")]
    UnknownPreset { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ConfigResult<PlantProfile> {
    let content = std::fs::read_to_string(path)?;
    let profile: PlantProfile = serde_yaml::from_str(&content)?;
    validate_profile(&profile)?;
    Ok(profile)
}

pub fn save_yaml(path: &std::path::Path, profile: &PlantProfile) -> ConfigResult<()> {
    validate_profile(profile)?;
    let content = serde_yaml::to_string(profile)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ConfigResult<PlantProfile> {
    let content = std::fs::read_to_string(path)?;
    let profile: PlantProfile = serde_json::from_str(&content)?;
    validate_profile(&profile)?;
    Ok(profile)
}

pub fn save_json(path: &std::path::Path, profile: &PlantProfile) -> ConfigResult<()> {
    validate_profile(profile)?;
    let content = serde_json::to_string_pretty(profile)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a profile, choosing the format from the file extension.
pub fn load_profile(path: &std::path::Path) -> ConfigResult<PlantProfile> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}
