use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use super::error::ConfigError;
use super::paths::resolve_config_file;
use super::types::AppConfig;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const PORT_ENV: &str = "PORT";
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub config_exists: bool,
}

/// Reads the config file, then applies environment overrides.
pub fn load_config(path_override: Option<PathBuf>) -> Result<LoadedConfig, ConfigError> {
    let path = resolve_config_file(path_override)?;
    let (mut config, config_exists) = read_config(&path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(LoadedConfig {
        config,
        path,
        config_exists,
    })
}

/// A missing file yields the defaults.
pub fn read_config(path: &Path) -> Result<(AppConfig, bool), ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok((toml::from_str(&contents)?, true)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no config file at {}, using defaults", path.display());
            Ok((AppConfig::default(), false))
        }
        Err(err) => Err(ConfigError::Io(err)),
    }
}

pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
        config.provider.api_key = Some(SecretString::new(key));
    }
    if let Some(port) = lookup(PORT_ENV) {
        config.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: PORT_ENV,
            value: port,
        })?;
    }
    if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
        config.provider.base_url = url;
    }
    Ok(())
}
