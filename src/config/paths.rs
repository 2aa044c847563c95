use std::path::PathBuf;

use super::error::ConfigError;

const APP_DIR: &str = "donna";
const CONFIG_FILE: &str = "config.toml";

/// `<platform config dir>/donna/config.toml`.
pub fn default_config_file() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::MissingConfigDir)?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

/// Resolves the config file, preferring an explicit path.
pub fn resolve_config_file(path_override: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match path_override {
        Some(path) => Ok(path),
        None => default_config_file(),
    }
}
