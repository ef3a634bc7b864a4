//! Market making error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MakerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Core error: {0}")]
    Core(#[from] stoikov_core::CoreError),
}

pub type MakerResult<T> = Result<T, MakerError>;
