// Redis error mapping

use deadletter_core::error::AppError;
use redis::ErrorKind;

// Helper to convert redis::Error to AppError with structured information
pub(crate) fn map_redis_error(err: redis::RedisError) -> AppError {
    if err.is_connection_refusal() || err.is_connection_dropped() {
        return AppError::Store(format!("Connection error: {}", err));
    }
    if err.is_timeout() {
        return AppError::Store(format!("Store timed out: {}", err));
    }
    if err.code() == Some("WRONGTYPE") {
        // A key written by something other than list commands
        return AppError::Store(format!("Key does not hold a list: {}", err));
    }
    match err.kind() {
        ErrorKind::AuthenticationFailed => {
            AppError::Store(format!("Authentication failed: {}", err))
        }
        ErrorKind::InvalidClientConfig => AppError::Config(format!("Invalid store address: {}", err)),
        _ => AppError::Store(err.to_string()),
    }
}
