//! Error handling
//!
//! Application error taxonomy shared by the profile store, memory sync and
//! the student manager.

use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input, rejected before any mutation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// External store rejected or could not receive a write
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Stored record could not be turned back into a profile
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// External service unreachable
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Language model backend error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding model error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable code, used in logs and backup snapshots.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION",
            AppError::Persistence(_) => "PERSISTENCE",
            AppError::Deserialization(_) => "DESERIALIZATION",
            AppError::Serialization(_) => "SERIALIZATION",
            AppError::Connection(_) => "CONNECTION",
            AppError::Config(_) => "CONFIG",
            AppError::Llm(_) => "LLM",
            AppError::Embedding(_) => "EMBEDDING",
            AppError::Io(_) => "IO",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            AppError::Connection(e.to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
