/// Configuration loading from a JSON file
use crate::config::types::{Result, VerifyConfig, VerifyError};
use std::path::Path;

/// Load a run configuration from a JSON file. Missing keys keep their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<VerifyConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        VerifyError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: VerifyConfig = serde_json::from_str(&content).map_err(|e| {
        VerifyError::Config(format!(
            "Failed to parse config JSON {}: {}",
            path.display(),
            e
        ))
    })?;

    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}
