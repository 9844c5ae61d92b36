// Redis QueueStore / ResponseStore Implementation
//
// Each queue is a Redis list of JSON-encoded messages. Every mutation is a
// single list command (RPUSH, LPOP, LREM, DEL), so concurrent callers never
// overwrite each other's changes.

use crate::connection::connect;
use crate::error::map_redis_error;
use async_trait::async_trait;
use deadletter_core::config::StoreConfig;
use deadletter_core::domain::Message;
use deadletter_core::error::Result;
use deadletter_core::port::{QueueEntry, QueueStore, Removal, ResponseStore};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, warn};

pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Connect using the configured address and credential
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(connect(config).await?))
    }

    // The multiplexed connection is cheap to clone and shares one socket
    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    async fn raw_entries(&self, key: &str) -> Result<Vec<String>> {
        let raw: Vec<String> = self
            .conn()
            .lrange(key, 0, -1)
            .await
            .map_err(map_redis_error)?;
        Ok(raw)
    }

    /// Find the first element matching `pred` in a snapshot, then remove
    /// exactly that element with LREM
    ///
    /// If another caller removed it in between, LREM removes nothing and the
    /// result is `NotFound`; other entries are never touched.
    async fn remove_first_matching<F>(&self, key: &str, pred: F) -> Result<Removal>
    where
        F: Fn(&Message) -> bool + Send,
    {
        let raw = self.raw_entries(key).await?;
        // Undecodable elements never match
        let target = raw
            .into_iter()
            .find(|entry| QueueEntry::decode(entry).message().is_some_and(&pred));

        let Some(entry) = target else {
            return Ok(Removal::NotFound);
        };

        let removed: i64 = self
            .conn()
            .lrem(key, 1, &entry)
            .await
            .map_err(map_redis_error)?;
        Ok(if removed > 0 {
            Removal::Removed
        } else {
            Removal::NotFound
        })
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn append(&self, key: &str, message: &Message) -> Result<()> {
        let raw = serde_json::to_string(message)?;
        let len: i64 = self
            .conn()
            .rpush(key, raw)
            .await
            .map_err(map_redis_error)?;
        debug!(queue = %key, len, "RPUSH");
        Ok(())
    }

    async fn read_entries(&self, key: &str) -> Result<Vec<QueueEntry>> {
        let raw = self.raw_entries(key).await?;
        Ok(raw.iter().map(|entry| QueueEntry::decode(entry)).collect())
    }

    async fn remove_head(&self, key: &str) -> Result<Removal> {
        let popped: Option<String> = self
            .conn()
            .lpop(key, None)
            .await
            .map_err(map_redis_error)?;
        Ok(match popped {
            Some(_) => Removal::Removed,
            None => Removal::NotFound,
        })
    }

    async fn remove_by_name(&self, key: &str, name: &str) -> Result<Removal> {
        let removal = self.remove_first_matching(key, |m| m.name == name).await?;
        if removal == Removal::NotFound {
            debug!(queue = %key, message = %name, "No entry with that name");
        }
        Ok(removal)
    }

    async fn remove_entry(&self, key: &str, message: &Message) -> Result<Removal> {
        self.remove_first_matching(key, |m| m == message).await
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let deleted: i64 = self.conn().del(key).await.map_err(map_redis_error)?;
        if deleted == 0 {
            debug!(queue = %key, "Queue already absent");
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseStore for RedisStore {
    async fn put_response(&self, key: &str, body: &[u8]) -> Result<()> {
        let _: () = self
            .conn()
            .set(key, body)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn get_response(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> = self.conn().get(key).await.map_err(|e| {
            warn!(key = %key, error = %e, "Failed to read response record");
            map_redis_error(e)
        })?;
        Ok(value)
    }
}

// These tests need a reachable Redis server:
//   DEADLETTER_TEST_REDIS=localhost:6379 cargo test -- --ignored
#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> (RedisStore, String) {
        let address =
            std::env::var("DEADLETTER_TEST_REDIS").unwrap_or_else(|_| "localhost:6379".to_string());
        let store = RedisStore::connect(&StoreConfig {
            address,
            credential: None,
        })
        .await
        .unwrap();
        let key = format!("deadletter-test-{}", uuid::Uuid::new_v4());
        (store, key)
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_append_and_read_all() {
        let (store, key) = setup_store().await;
        assert!(store.read_all(&key).await.unwrap().is_empty());

        for name in ["a", "b", "c"] {
            store
                .append(&key, &Message::new(name, "http://x", "GET"))
                .await
                .unwrap();
        }

        let names: Vec<_> = store
            .read_all(&key)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        store.clear(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_remove_head_and_by_name() {
        let (store, key) = setup_store().await;
        for name in ["a", "b", "c"] {
            store
                .append(&key, &Message::new(name, "http://x/same", "GET"))
                .await
                .unwrap();
        }

        assert_eq!(store.remove_head(&key).await.unwrap(), Removal::Removed);
        assert_eq!(store.remove_by_name(&key, "c").await.unwrap(), Removal::Removed);
        assert_eq!(store.remove_by_name(&key, "c").await.unwrap(), Removal::NotFound);

        let rest = store.read_all(&key).await.unwrap();
        assert_eq!(rest, vec![Message::new("b", "http://x/same", "GET")]);

        store.clear(&key).await.unwrap();
        assert_eq!(store.remove_head(&key).await.unwrap(), Removal::NotFound);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_concurrent_appends_and_head_removals() {
        let (store, key) = setup_store().await;
        let store = std::sync::Arc::new(store);
        for i in 0..50 {
            store
                .append(&key, &Message::new(format!("seed-{}", i), "http://x", "GET"))
                .await
                .unwrap();
        }

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..50 {
            let store = store.clone();
            let key = key.clone();
            tasks.spawn(async move {
                store
                    .append(&key, &Message::new(format!("new-{}", i), "http://x", "GET"))
                    .await
                    .unwrap();
                store.remove_head(&key).await.unwrap();
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        // Every seed is gone, every new entry survives
        let rest = store.read_all(&key).await.unwrap();
        assert_eq!(rest.len(), 50);
        assert!(rest.iter().all(|m| m.name.starts_with("new-")));
        store.clear(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_response_records() {
        let (store, key) = setup_store().await;
        assert_eq!(store.get_response(&key).await.unwrap(), None);
        store.put_response(&key, b"").await.unwrap();
        assert_eq!(store.get_response(&key).await.unwrap(), Some(Vec::new()));
        store.put_response(&key, &[0xff, b'o', b'k']).await.unwrap();
        assert_eq!(
            store.get_response(&key).await.unwrap(),
            Some(vec![0xff, b'o', b'k'])
        );
        let _: () = store.conn().del(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_undecodable_element_keeps_its_position() {
        let (store, key) = setup_store().await;
        let _: () = store.conn().rpush(&key, "garbage").await.unwrap();
        store
            .append(&key, &Message::new("a", "http://x", "GET"))
            .await
            .unwrap();

        let entries = store.read_entries(&key).await.unwrap();
        assert!(matches!(&entries[0], QueueEntry::Undecodable { raw, .. } if raw == "garbage"));
        assert_eq!(entries[1].message().map(|m| m.name.as_str()), Some("a"));
        assert_eq!(store.read_all(&key).await.unwrap().len(), 1);
        store.clear(&key).await.unwrap();
    }
}
