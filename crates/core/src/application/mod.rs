// Application Layer - Use Cases and Business Logic

pub mod dispatch;
pub mod manager;

// Re-exports
pub use dispatch::{DispatchEngine, MessageOutcome, PassReport, ProcessedMessage};
pub use manager::{QueueKind, QueueLength, QueueManager};
