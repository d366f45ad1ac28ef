// survival_ai_core/ai/src/core/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Model failed to load: {0}")]
    LoadFailed(String),
}

#[derive(Error, Debug)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type AiResult<T> = Result<T, AiError>;
