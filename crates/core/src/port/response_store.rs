// Response Store Port (Interface)

use crate::error::Result;
use async_trait::async_trait;

/// Single-value records holding the raw response body of executed messages
///
/// Records share the store's keyspace with the queues; callers keep record
/// keys disjoint from queue keys.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Write (or overwrite) the body recorded under `key`
    async fn put_response(&self, key: &str, body: &[u8]) -> Result<()>;

    /// `None` when no record was ever written, as opposed to an empty body
    async fn get_response(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

pub mod mocks {
    use super::*;
    use crate::port::queue_store::mocks::{wrong_type, InMemoryStore, Slot};

    #[async_trait]
    impl ResponseStore for InMemoryStore {
        // Like SET, replaces whatever the key held, lists included
        async fn put_response(&self, key: &str, body: &[u8]) -> Result<()> {
            self.check_available()?;
            self.keys
                .lock()
                .unwrap()
                .insert(key.to_string(), Slot::Value(body.to_vec()));
            Ok(())
        }

        async fn get_response(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.check_available()?;
            match self.keys.lock().unwrap().get(key) {
                None => Ok(None),
                Some(Slot::Value(body)) => Ok(Some(body.clone())),
                Some(Slot::List(_)) => Err(wrong_type(key)),
            }
        }
    }
}
