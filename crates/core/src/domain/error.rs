// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid HTTP status code: {0}")]
    InvalidStatusCode(u16),
}

pub type Result<T> = std::result::Result<T, DomainError>;
