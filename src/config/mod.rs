//! File and environment configuration for the relay binaries.

mod error;
mod load;
mod paths;
mod types;

pub use error::ConfigError;
pub use load::{
    apply_env_overrides, load_config, read_config, LoadedConfig, API_KEY_ENV, BASE_URL_ENV,
    PORT_ENV,
};
pub use paths::{default_config_file, resolve_config_file};
pub use types::{AppConfig, LoggingConfig, ProviderConfig, ServerConfig};
