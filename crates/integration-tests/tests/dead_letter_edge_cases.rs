//! Dead-Letter Edge Case Tests
//!
//! Re-filing between dead-letter queues, accumulation of copies, store
//! outages and unnamed messages.

use deadletter_core::application::{MessageOutcome, QueueManager};
use deadletter_core::config::ClientConfig;
use deadletter_core::domain::{DeadStatusCodes, Message};
use deadletter_core::error::AppError;
use deadletter_core::port::http_transport::mocks::MockTransport;
use deadletter_core::port::queue_store::mocks::InMemoryStore;
use deadletter_core::port::{Removal, TransportError};
use std::sync::Arc;

fn setup(dead: &[u16]) -> (QueueManager, Arc<InMemoryStore>, Arc<MockTransport>) {
    let store = Arc::new(InMemoryStore::new());
    let transport = Arc::new(MockTransport::new());
    let config = ClientConfig {
        queue_key: "requests".to_string(),
        dead_status_codes: DeadStatusCodes::new(dead.iter().copied()).unwrap(),
        ..Default::default()
    };
    let manager =
        QueueManager::new(config, store.clone(), store.clone(), transport.clone()).unwrap();
    (manager, store, transport)
}

/// A retry failing with another dead code moves the message to that queue
#[tokio::test]
async fn test_retry_moves_between_dead_queues() {
    let (manager, store, transport) = setup(&[429, 503]);
    let msg = Message::new("flaky", "http://x/flaky", "GET");
    store.seed("429", [msg.clone()]);
    transport.respond("http://x/flaky", 503, "unavailable");

    let reports = manager.execute_dead_queue().await.unwrap();

    // 429 is visited first; the re-filed copy in 503 is picked up by the
    // 503 pass that follows, and lands back in 503
    assert_eq!(
        reports[0].outcome_of("flaky"),
        Some(&MessageOutcome::DeadLettered {
            status: 503,
            queue: "503".to_string()
        })
    );
    assert_eq!(reports[1].processed(), 1);
    assert!(manager.list_queue("429").await.unwrap().is_empty());
    assert_eq!(manager.list_queue("503").await.unwrap(), vec![msg]);
    assert_eq!(transport.call_count(), 2);
}

/// Same-code failure re-files into the same queue without growing it
#[tokio::test]
async fn test_retry_same_code_cycles() {
    let (manager, store, transport) = setup(&[429]);
    let msg = Message::new("limited", "http://x/limited", "GET");
    store.seed("429", [msg.clone()]);
    transport.respond("http://x/limited", 429, "slow down");

    for _ in 0..3 {
        let reports = manager.execute_dead_queue().await.unwrap();
        assert_eq!(reports[0].processed(), 1);
        assert_eq!(manager.list_queue("429").await.unwrap(), vec![msg.clone()]);
    }
    assert_eq!(transport.call_count(), 3);
}

/// Repeated failures from the request queue accumulate copies (no dedup)
#[tokio::test]
async fn test_dead_letter_copies_accumulate() {
    let (manager, _store, transport) = setup(&[500]);
    transport.respond("http://x/fail", 500, "");
    let msg = Message::new("dup", "http://x/fail", "GET");

    for _ in 0..2 {
        manager.add_message(&msg).await.unwrap();
        manager.execute_queue().await.unwrap();
    }

    assert_eq!(
        manager.list_queue("500").await.unwrap(),
        vec![msg.clone(), msg]
    );
    assert_eq!(manager.delete_from_dead_queues("dup").await.unwrap(), Removal::Removed);
    assert_eq!(manager.list_queue("500").await.unwrap().len(), 1);
}

/// A re-executed name overwrites its response record
#[tokio::test]
async fn test_response_overwritten_on_reexecution() {
    let (manager, _store, transport) = setup(&[500]);
    let msg = Message::new("status", "http://x/status", "GET");

    transport.respond("http://x/status", 200, "first");
    manager.add_message(&msg).await.unwrap();
    manager.execute_queue().await.unwrap();

    transport.respond("http://x/status", 200, "second");
    manager.add_message(&msg).await.unwrap();
    manager.execute_queue().await.unwrap();

    assert_eq!(manager.get_response("status").await.unwrap().as_deref(), Some(&b"second"[..]));
}

/// Unnamed messages record under url+method and delete by full equality
#[tokio::test]
async fn test_unnamed_messages() {
    let (manager, _store, transport) = setup(&[500]);
    transport.respond("http://x/anon", 200, "anon body");

    let anon = Message::new("", "http://x/anon", "GET");
    manager.add_message(&anon).await.unwrap();
    manager.execute_queue().await.unwrap();
    assert_eq!(
        manager.get_response("http://x/anonGET").await.unwrap().as_deref(),
        Some(&b"anon body"[..])
    );

    let keep = Message::new("", "http://x/keep", "GET");
    manager.add_message(&keep).await.unwrap();
    manager.add_message(&anon).await.unwrap();
    assert_eq!(manager.delete_exact("requests", &anon).await.unwrap(), Removal::Removed);
    assert_eq!(manager.list_request_queue().await.unwrap(), vec![keep]);
}

/// Transport failures never reach a dead-letter queue
#[tokio::test]
async fn test_transport_failure_not_dead_lettered() {
    let (manager, _store, transport) = setup(&[500]);
    transport.fail("http://x/hang", TransportError::Timeout(30_000));

    manager
        .add_message(&Message::new("hang", "http://x/hang", "GET"))
        .await
        .unwrap();
    let report = manager.execute_queue().await.unwrap();

    assert!(matches!(
        report.outcome_of("hang"),
        Some(MessageOutcome::TransportFailed { reason }) if reason.contains("timed out")
    ));
    assert!(manager.list_request_queue().await.unwrap().is_empty());
    assert!(manager.list_queue("500").await.unwrap().is_empty());
    assert_eq!(manager.get_response("hang").await.unwrap(), None);
}

/// Store outage surfaces as a typed error and loses nothing
#[tokio::test]
async fn test_store_outage() {
    let (manager, store, transport) = setup(&[500]);
    transport.respond("http://x/ok", 200, "ok");
    manager
        .add_message(&Message::new("kept", "http://x/ok", "GET"))
        .await
        .unwrap();

    store.set_unavailable(true);
    let add = manager.add_message(&Message::new("lost", "http://x/ok", "GET")).await;
    assert!(matches!(add, Err(AppError::Store(_))));
    assert!(matches!(manager.execute_queue().await, Err(AppError::Store(_))));
    assert!(matches!(manager.clear_request_queue().await, Err(AppError::Store(_))));
    assert_eq!(transport.call_count(), 0);

    store.set_unavailable(false);
    let names: Vec<_> = manager
        .list_request_queue()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["kept"]);
}

/// Clearing dead queues touches only the configured dead keys
#[tokio::test]
async fn test_clear_dead_queues_scope() {
    let (manager, store, _transport) = setup(&[429, 500]);
    store.seed("requests", [Message::new("r", "http://x", "GET")]);
    store.seed("429", [Message::new("a", "http://x", "GET")]);
    store.seed("500", [Message::new("b", "http://x", "GET")]);
    store.seed("404", [Message::new("c", "http://x", "GET")]);

    manager.clear_dead_queues().await.unwrap();

    assert!(manager.list_queue("429").await.unwrap().is_empty());
    assert!(manager.list_queue("500").await.unwrap().is_empty());
    assert_eq!(manager.list_queue("404").await.unwrap().len(), 1);
    assert_eq!(manager.list_request_queue().await.unwrap().len(), 1);
}

/// A message named after a queue is rejected before it can replace that queue
#[tokio::test]
async fn test_names_colliding_with_queue_keys_are_rejected() {
    let (manager, store, transport) = setup(&[500]);
    transport.respond("http://x/ok", 200, "body");
    let parked = Message::new("parked", "http://x/old", "GET");
    store.seed("500", [parked.clone()]);

    for name in ["requests", "500"] {
        let result = manager
            .add_message(&Message::new(name, "http://x/ok", "GET"))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))), "{}", name);
    }
    manager
        .add_message(&Message::new("pending", "http://x/ok", "GET"))
        .await
        .unwrap();
    manager.execute_queue().await.unwrap();

    assert!(store.holds_list("500"));
    assert_eq!(manager.list_queue("500").await.unwrap(), vec![parked]);
}

/// A foreign element at the head is dropped instead of wedging every pass
#[tokio::test]
async fn test_garbage_head_does_not_block_the_queue() {
    let (manager, store, transport) = setup(&[500]);
    transport.respond("http://x/ok", 200, "ok");
    store.seed_raw("requests", r#"[{"Name":"legacy array"}]"#);
    manager
        .add_message(&Message::new("after", "http://x/ok", "GET"))
        .await
        .unwrap();

    let report = manager.execute_queue().await.unwrap();

    assert_eq!(report.processed(), 2);
    assert_eq!(report.undecodable(), 1);
    assert!(matches!(
        report.messages[0].outcome,
        MessageOutcome::Undecodable { .. }
    ));
    assert_eq!(report.outcome_of("after"), Some(&MessageOutcome::Completed { status: 200 }));
    assert!(!store.has_key("requests"));
    assert!(manager.list_queue("500").await.unwrap().is_empty());
}
