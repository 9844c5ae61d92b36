// Client Configuration
//
// Consumed once at construction; every field has a default so a partial
// file or environment overlay deserializes cleanly.

use crate::domain::{dead_letter_key, DeadStatusCodes, QueueKey, DEFAULT_QUEUE_KEY};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Default key-value store endpoint
pub const DEFAULT_STORE_ADDRESS: &str = "localhost:6379";

/// Default outbound request timeout (30s)
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Key-value store connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `host:port` or a full `redis://` / `rediss://` URL
    pub address: String,
    pub credential: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_STORE_ADDRESS.to_string(),
            credential: None,
        }
    }
}

/// Outbound HTTP settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

/// Full client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub store: StoreConfig,
    pub queue_key: QueueKey,
    pub dead_status_codes: DeadStatusCodes,
    pub http: HttpConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            dead_status_codes: DeadStatusCodes::default(),
            http: HttpConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Reject configurations whose queue families would overlap
    pub fn validate(&self) -> Result<()> {
        if self.queue_key.trim().is_empty() {
            return Err(AppError::Config("queue key cannot be empty".to_string()));
        }
        if self
            .dead_status_codes
            .codes()
            .iter()
            .any(|code| dead_letter_key(*code) == self.queue_key)
        {
            return Err(AppError::Config(format!(
                "queue key '{}' collides with a dead-letter queue",
                self.queue_key
            )));
        }
        Ok(())
    }
}
