//! CLI configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use trellis_core::EngineConfig;

/// Name of the engine config file inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trellis")
}

/// Load the engine configuration.
///
/// An explicit path must exist. Otherwise `<data_dir>/config.toml` is used
/// when present, and the defaults when not.
pub fn load_engine_config(explicit: Option<&Path>, data_dir: &Path) -> anyhow::Result<EngineConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = data_dir.join(CONFIG_FILE);
            if !path.exists() {
                tracing::debug!("No config file at {:?}, using defaults", path);
                return Ok(EngineConfig::default());
            }
            path
        }
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&contents)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    tracing::debug!("Loaded config from {:?}", path);
    Ok(config)
}
