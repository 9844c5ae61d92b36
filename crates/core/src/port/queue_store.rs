// Queue Store Port (Interface)

use crate::domain::Message;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

/// Outcome of a removal request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Removal {
    Removed,
    NotFound,
}

impl Removal {
    pub fn is_removed(&self) -> bool {
        matches!(self, Removal::Removed)
    }
}

/// One list element as read from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEntry {
    Message(Message),
    /// Element that does not decode as a message (foreign or corrupt)
    Undecodable { raw: String, reason: String },
}

impl QueueEntry {
    /// Decode a raw list element
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Message>(raw) {
            Ok(message) => QueueEntry::Message(message),
            Err(e) => QueueEntry::Undecodable {
                raw: raw.to_string(),
                reason: e.to_string(),
            },
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            QueueEntry::Message(message) => Some(message),
            QueueEntry::Undecodable { .. } => None,
        }
    }
}

/// Key-addressed persistent FIFO list of messages
///
/// Every operation must be atomic with respect to the others on the same
/// key. Implementations use native list primitives; a read-whole-list,
/// mutate, write-whole-list sequence does not satisfy this contract.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append to the tail (creates the queue on first use)
    async fn append(&self, key: &str, message: &Message) -> Result<()>;

    /// Ordered snapshot of every element, decodable or not
    ///
    /// Empty when the key is absent. Positions line up with the list, so
    /// the n-th entry is the one `remove_head` drops after n-1 removals.
    async fn read_entries(&self, key: &str) -> Result<Vec<QueueEntry>>;

    /// Ordered snapshot of the decodable messages
    async fn read_all(&self, key: &str) -> Result<Vec<Message>> {
        let entries = self.read_entries(key).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                QueueEntry::Message(message) => Some(message),
                QueueEntry::Undecodable { reason, .. } => {
                    warn!(queue = %key, error = %reason, "Skipping undecodable queue element");
                    None
                }
            })
            .collect())
    }

    /// Remove the first element
    async fn remove_head(&self, key: &str) -> Result<Removal>;

    /// Remove the first element whose name matches
    async fn remove_by_name(&self, key: &str, name: &str) -> Result<Removal>;

    /// Remove the first element equal to `message` by full serialization
    async fn remove_entry(&self, key: &str, message: &Message) -> Result<Removal>;

    /// Delete the whole queue
    async fn clear(&self, key: &str) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Value held by one key
    ///
    /// Queues and response records live in one namespace, as they do in the
    /// real store: a plain SET replaces a list, and list commands on a plain
    /// value fail with a type error.
    #[derive(Debug, Clone)]
    pub(crate) enum Slot {
        List(VecDeque<QueueEntry>),
        Value(Vec<u8>),
    }

    /// In-memory store (queues + response records) for testing
    #[derive(Default)]
    pub struct InMemoryStore {
        pub(crate) keys: Mutex<HashMap<String, Slot>>,
        unavailable: AtomicBool,
    }

    pub(crate) fn wrong_type(key: &str) -> AppError {
        AppError::Store(format!("Key does not hold a list: WRONGTYPE {}", key))
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Simulate a lost store connection (every call fails)
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Synchronously push messages onto a queue's tail
        ///
        /// Replaces a plain value held by the key.
        pub fn seed(&self, key: &str, messages: impl IntoIterator<Item = Message>) {
            self.push_entries(key, messages.into_iter().map(QueueEntry::Message));
        }

        /// Push a raw element as another producer might have written it
        pub fn seed_raw(&self, key: &str, raw: &str) {
            self.push_entries(key, [QueueEntry::decode(raw)]);
        }

        fn push_entries(&self, key: &str, entries: impl IntoIterator<Item = QueueEntry>) {
            let mut keys = self.keys.lock().unwrap();
            let slot = keys
                .entry(key.to_string())
                .or_insert_with(|| Slot::List(VecDeque::new()));
            if let Slot::Value(_) = slot {
                *slot = Slot::List(VecDeque::new());
            }
            if let Slot::List(list) = slot {
                list.extend(entries);
            }
        }

        /// Synchronous snapshot of a queue's decodable messages
        pub fn snapshot(&self, key: &str) -> Vec<Message> {
            match self.keys.lock().unwrap().get(key) {
                Some(Slot::List(list)) => list.iter().filter_map(|e| e.message().cloned()).collect(),
                _ => Vec::new(),
            }
        }

        /// Whether the key exists at all
        pub fn has_key(&self, key: &str) -> bool {
            self.keys.lock().unwrap().contains_key(key)
        }

        /// Whether the key holds a list (as opposed to a plain value)
        pub fn holds_list(&self, key: &str) -> bool {
            matches!(self.keys.lock().unwrap().get(key), Some(Slot::List(_)))
        }

        pub(crate) fn check_available(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::Store("connection refused".to_string()));
            }
            Ok(())
        }

        fn remove_first<F>(&self, key: &str, pred: F) -> Result<Removal>
        where
            F: Fn(&QueueEntry) -> bool,
        {
            let mut keys = self.keys.lock().unwrap();
            let list = match keys.get_mut(key) {
                None => return Ok(Removal::NotFound),
                Some(Slot::Value(_)) => return Err(wrong_type(key)),
                Some(Slot::List(list)) => list,
            };
            let removal = match list.iter().position(pred) {
                Some(idx) => {
                    list.remove(idx);
                    Removal::Removed
                }
                None => Removal::NotFound,
            };
            // An emptied list no longer exists
            if list.is_empty() {
                keys.remove(key);
            }
            Ok(removal)
        }
    }

    #[async_trait]
    impl QueueStore for InMemoryStore {
        async fn append(&self, key: &str, message: &Message) -> Result<()> {
            self.check_available()?;
            if let Some(Slot::Value(_)) = self.keys.lock().unwrap().get(key) {
                return Err(wrong_type(key));
            }
            self.seed(key, [message.clone()]);
            Ok(())
        }

        async fn read_entries(&self, key: &str) -> Result<Vec<QueueEntry>> {
            self.check_available()?;
            match self.keys.lock().unwrap().get(key) {
                None => Ok(Vec::new()),
                Some(Slot::List(list)) => Ok(list.iter().cloned().collect()),
                Some(Slot::Value(_)) => Err(wrong_type(key)),
            }
        }

        async fn remove_head(&self, key: &str) -> Result<Removal> {
            self.check_available()?;
            self.remove_first(key, |_| true)
        }

        async fn remove_by_name(&self, key: &str, name: &str) -> Result<Removal> {
            self.check_available()?;
            self.remove_first(key, |e| e.message().is_some_and(|m| m.name == name))
        }

        async fn remove_entry(&self, key: &str, message: &Message) -> Result<Removal> {
            self.check_available()?;
            self.remove_first(key, |e| e.message() == Some(message))
        }

        async fn clear(&self, key: &str) -> Result<()> {
            self.check_available()?;
            self.keys.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
