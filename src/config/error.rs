use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("no config directory available on this platform")]
    MissingConfigDir,
    #[error("GEMINI_API_KEY is not set and no provider.api_key is configured")]
    MissingApiKey,
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}
