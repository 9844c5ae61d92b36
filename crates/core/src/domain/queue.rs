// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Queue identifier (request queue name, or a stringified status code)
pub type QueueKey = String;

/// Default request queue key
pub const DEFAULT_QUEUE_KEY: &str = "ReqQueue";

/// Status codes dead-lettered when nothing is configured
pub const DEFAULT_DEAD_STATUS_CODES: [u16; 7] = [400, 403, 429, 500, 502, 503, 504];

/// Ordered, duplicate-free set of "dead" HTTP status codes
///
/// Order is the configured order; it decides the sequence in which
/// dead-letter queues are visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadStatusCodes(Vec<u16>);

impl DeadStatusCodes {
    /// Build from codes, keeping the first occurrence of each
    pub fn new(codes: impl IntoIterator<Item = u16>) -> Result<Self> {
        let mut out: Vec<u16> = Vec::new();
        for code in codes {
            if !(100..=599).contains(&code) {
                return Err(DomainError::InvalidStatusCode(code));
            }
            if !out.contains(&code) {
                out.push(code);
            }
        }
        Ok(Self(out))
    }

    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }

    pub fn codes(&self) -> &[u16] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Dead-letter queue keys in configured order
    pub fn queue_keys(&self) -> impl Iterator<Item = QueueKey> + '_ {
        self.0.iter().map(|code| dead_letter_key(*code))
    }
}

impl Default for DeadStatusCodes {
    fn default() -> Self {
        Self(DEFAULT_DEAD_STATUS_CODES.to_vec())
    }
}

impl<'de> Deserialize<'de> for DeadStatusCodes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let codes = Vec::<u16>::deserialize(deserializer)?;
        DeadStatusCodes::new(codes).map_err(serde::de::Error::custom)
    }
}

/// Dead-letter queue key for a status code
pub fn dead_letter_key(status: u16) -> QueueKey {
    status.to_string()
}

/// Dead-letter routing decision
///
/// Returns the target dead-letter queue iff `status` is configured as dead.
/// `None` means the message reached a terminal state and is dropped.
pub fn route(status: u16, dead_codes: &DeadStatusCodes) -> Option<QueueKey> {
    dead_codes.contains(status).then(|| dead_letter_key(status))
}
