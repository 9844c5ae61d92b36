// Queue Manager - public surface over the request queue and dead-letter queues

use crate::application::dispatch::{DispatchEngine, PassReport};
use crate::config::ClientConfig;
use crate::domain::{Message, QueueKey};
use crate::error::{AppError, Result};
use crate::port::{HttpTransport, QueueStore, Removal, ResponseStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Which queue family a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    Request,
    DeadLetter,
}

/// Current length of one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueLength {
    pub queue: QueueKey,
    pub kind: QueueKind,
    pub len: usize,
}

/// Queue Manager
///
/// An explicitly constructed, caller-owned handle; it holds no cached queue
/// state between calls.
pub struct QueueManager {
    config: ClientConfig,
    store: Arc<dyn QueueStore>,
    responses: Arc<dyn ResponseStore>,
    engine: DispatchEngine,
}

impl QueueManager {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn QueueStore>,
        responses: Arc<dyn ResponseStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        config.validate()?;
        let engine = DispatchEngine::new(
            Arc::clone(&store),
            Arc::clone(&responses),
            transport,
            config.queue_key.clone(),
            config.dead_status_codes.clone(),
        );
        Ok(Self {
            config,
            store,
            responses,
            engine,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn request_key(&self) -> &str {
        &self.config.queue_key
    }

    pub fn dead_queue_keys(&self) -> Vec<QueueKey> {
        self.config.dead_status_codes.queue_keys().collect()
    }

    /// Append a message to the request queue
    ///
    /// The message's response key must not name a queue: response records
    /// and queues share one keyspace.
    pub async fn add_message(&self, message: &Message) -> Result<()> {
        validate_message(message)?;
        let response_key = message.response_key();
        if self.engine.is_queue_key(&response_key) {
            return Err(AppError::Validation(format!(
                "response key '{}' collides with a queue key",
                response_key
            )));
        }
        self.store.append(self.request_key(), message).await?;
        info!(queue = %self.request_key(), message = %message.name, "Message queued");
        Ok(())
    }

    /// One pass over the request queue
    pub async fn execute_queue(&self) -> Result<PassReport> {
        self.engine.execute_queue(self.request_key()).await
    }

    /// One pass over an arbitrary queue key
    pub async fn execute_queue_key(&self, key: &str) -> Result<PassReport> {
        self.engine.execute_queue(key).await
    }

    /// One pass over every dead-letter queue, in configured order
    pub async fn execute_dead_queue(&self) -> Result<Vec<PassReport>> {
        self.engine.execute_dead_queues().await
    }

    pub async fn delete_message(&self, key: &str, name: &str) -> Result<Removal> {
        self.store.remove_by_name(key, name).await
    }

    /// Remove one entry equal to `message` (for queues holding unnamed entries)
    pub async fn delete_exact(&self, key: &str, message: &Message) -> Result<Removal> {
        self.store.remove_entry(key, message).await
    }

    pub async fn delete_from_request_queue(&self, name: &str) -> Result<Removal> {
        self.delete_message(self.request_key(), name).await
    }

    /// Remove `name` from every dead-letter queue
    ///
    /// `Removed` if at least one queue held it.
    pub async fn delete_from_dead_queues(&self, name: &str) -> Result<Removal> {
        let mut removal = Removal::NotFound;
        for key in self.config.dead_status_codes.queue_keys() {
            if self.store.remove_by_name(&key, name).await?.is_removed() {
                removal = Removal::Removed;
            }
        }
        Ok(removal)
    }

    pub async fn clear_queue(&self, key: &str) -> Result<()> {
        self.store.clear(key).await?;
        info!(queue = %key, "Queue cleared");
        Ok(())
    }

    pub async fn clear_request_queue(&self) -> Result<()> {
        self.clear_queue(self.request_key()).await
    }

    pub async fn clear_dead_queues(&self) -> Result<()> {
        for key in self.config.dead_status_codes.queue_keys() {
            self.clear_queue(&key).await?;
        }
        Ok(())
    }

    /// Ordered contents of a queue
    pub async fn list_queue(&self, key: &str) -> Result<Vec<Message>> {
        self.store.read_all(key).await
    }

    pub async fn list_request_queue(&self) -> Result<Vec<Message>> {
        self.list_queue(self.request_key()).await
    }

    /// Recorded response body; `None` when nothing was ever recorded
    pub async fn get_response(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.responses.get_response(key).await
    }

    /// Lengths of the request queue followed by each dead-letter queue
    pub async fn queue_lengths(&self) -> Result<Vec<QueueLength>> {
        let mut lengths = Vec::new();
        lengths.push(QueueLength {
            queue: self.request_key().to_string(),
            kind: QueueKind::Request,
            len: self.list_request_queue().await?.len(),
        });
        for key in self.config.dead_status_codes.queue_keys() {
            let len = self.list_queue(&key).await?.len();
            lengths.push(QueueLength {
                queue: key,
                kind: QueueKind::DeadLetter,
                len,
            });
        }
        Ok(lengths)
    }
}

fn validate_message(message: &Message) -> Result<()> {
    if message.url.trim().is_empty() {
        return Err(AppError::Validation("message url cannot be empty".to_string()));
    }
    let method = message.normalized_method();
    if method.is_empty() || !method.bytes().all(is_token_char) {
        return Err(AppError::Validation(format!(
            "invalid HTTP method '{}'",
            message.method
        )));
    }
    Ok(())
}

// RFC 9110 token: visible ASCII minus delimiters
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
