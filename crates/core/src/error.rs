// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Connectivity or command failure talking to the key-value store
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::port::TransportError),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: redis::Error conversion is handled in infra-redis crate
// by converting to AppError::Store(String)
