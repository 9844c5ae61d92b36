// Domain Layer - Pure business logic and entities

pub mod error;
pub mod message;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use message::{Headers, Message, ParamValue, PostParams, ResponseKey};
pub use queue::{
    dead_letter_key, route, DeadStatusCodes, QueueKey, DEFAULT_DEAD_STATUS_CODES,
    DEFAULT_QUEUE_KEY,
};
