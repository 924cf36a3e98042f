//! Error types for sme-core

use thiserror::Error;

/// Main error type for sme-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Azure OpenAI error: {0}")]
    AzureOpenAi(String),

    #[error("Azure OpenAI returned an empty response")]
    EmptyResponse,

    #[error("Circuit breaker is open")]
    CircuitOpen,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sme-core
pub type Result<T> = std::result::Result<T, Error>;
