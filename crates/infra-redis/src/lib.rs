// Deadletter Infrastructure - Redis Adapter
// Implements: QueueStore (native list primitives), ResponseStore (GET/SET)

mod connection;
mod error;
mod store;

pub use connection::{connect, connection_info};
pub use store::RedisStore;

// Note: redis::Error conversion is handled by a helper function
// due to Rust's orphan rules (cannot implement From<redis::Error> for AppError here)
