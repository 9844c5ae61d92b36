// Dispatch Engine - one linear pass over a queue snapshot

use crate::domain::{route, DeadStatusCodes, Message, QueueKey};
use crate::error::Result;
use crate::port::{HttpTransport, OutboundRequest, QueueEntry, QueueStore, Removal, ResponseStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to one message during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// Non-dead status: terminal, dropped from the source queue
    Completed { status: u16 },
    /// Dead status: a copy was filed into `queue`
    DeadLettered { status: u16, queue: QueueKey },
    /// No status code was obtained; removed without response or filing
    TransportFailed { reason: String },
    /// The element did not decode as a message; removed unexecuted
    Undecodable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedMessage {
    pub name: String,
    #[serde(flatten)]
    pub outcome: MessageOutcome,
}

/// Per-message outcomes of one pass, in snapshot order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub queue: QueueKey,
    pub messages: Vec<ProcessedMessage>,
}

impl PassReport {
    fn new(queue: &str) -> Self {
        Self {
            queue: queue.to_string(),
            messages: Vec::new(),
        }
    }

    /// True when the snapshot was empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.messages.len()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Completed { .. }))
    }

    pub fn dead_lettered(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::DeadLettered { .. }))
    }

    pub fn transport_failures(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::TransportFailed { .. }))
    }

    pub fn undecodable(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Undecodable { .. }))
    }

    pub fn outcome_of(&self, name: &str) -> Option<&MessageOutcome> {
        self.messages
            .iter()
            .find(|m| m.name == name)
            .map(|m| &m.outcome)
    }

    fn count(&self, pred: impl Fn(&MessageOutcome) -> bool) -> usize {
        self.messages.iter().filter(|m| pred(&m.outcome)).count()
    }
}

/// Executes queued HTTP calls and routes failures into dead-letter queues
pub struct DispatchEngine {
    store: Arc<dyn QueueStore>,
    responses: Arc<dyn ResponseStore>,
    transport: Arc<dyn HttpTransport>,
    request_key: QueueKey,
    dead_codes: DeadStatusCodes,
}

impl DispatchEngine {
    pub fn new(
        store: Arc<dyn QueueStore>,
        responses: Arc<dyn ResponseStore>,
        transport: Arc<dyn HttpTransport>,
        request_key: impl Into<QueueKey>,
        dead_codes: DeadStatusCodes,
    ) -> Self {
        Self {
            store,
            responses,
            transport,
            request_key: request_key.into(),
            dead_codes,
        }
    }

    pub fn dead_codes(&self) -> &DeadStatusCodes {
        &self.dead_codes
    }

    /// Whether `key` names the request queue or a dead-letter queue
    pub fn is_queue_key(&self, key: &str) -> bool {
        key == self.request_key || self.dead_codes.queue_keys().any(|k| k == key)
    }

    /// Run one pass over the messages currently at `key`
    ///
    /// Messages appended after the snapshot is read wait for the next pass.
    /// Transport failures and undecodable elements are isolated per entry.
    /// A store failure aborts the pass and leaves the current entry at the
    /// head of the queue.
    pub async fn execute_queue(&self, key: &str) -> Result<PassReport> {
        let snapshot = self.store.read_entries(key).await?;
        let mut report = PassReport::new(key);

        if snapshot.is_empty() {
            info!(queue = %key, "No messages in queue to execute");
            return Ok(report);
        }

        info!(queue = %key, count = snapshot.len(), "Executing queue");

        for entry in snapshot {
            let processed = match entry {
                QueueEntry::Message(message) => {
                    let outcome = self.process(&message).await?;
                    ProcessedMessage {
                        name: message.name,
                        outcome,
                    }
                }
                QueueEntry::Undecodable { reason, .. } => {
                    error!(queue = %key, error = %reason, "Undecodable queue element, dropping it");
                    ProcessedMessage {
                        name: String::new(),
                        outcome: MessageOutcome::Undecodable { reason },
                    }
                }
            };

            // Removed regardless of outcome so a poison entry cannot loop
            if self.store.remove_head(key).await? == Removal::NotFound {
                warn!(queue = %key, message = %processed.name, "Queue head already removed");
            }
            report.messages.push(processed);
        }

        info!(
            queue = %key,
            completed = report.completed(),
            dead_lettered = report.dead_lettered(),
            transport_failures = report.transport_failures(),
            undecodable = report.undecodable(),
            "Queue pass finished"
        );
        Ok(report)
    }

    /// Run one pass over every dead-letter queue, in configured order
    pub async fn execute_dead_queues(&self) -> Result<Vec<PassReport>> {
        let mut reports = Vec::with_capacity(self.dead_codes.codes().len());
        for key in self.dead_codes.queue_keys() {
            reports.push(self.execute_queue(&key).await?);
        }
        Ok(reports)
    }

    async fn process(&self, message: &Message) -> Result<MessageOutcome> {
        let request = OutboundRequest::from_message(message);

        let outcome = match self.transport.send(&request).await {
            Err(e) => {
                error!(
                    message = %message.name,
                    url = %message.url,
                    error = %e,
                    "Error making HTTP request"
                );
                MessageOutcome::TransportFailed {
                    reason: e.to_string(),
                }
            }
            Ok(response) => {
                let response_key = message.response_key();
                if self.is_queue_key(&response_key) {
                    // A plain write would replace the queue
                    warn!(
                        message = %message.name,
                        key = %response_key,
                        "Response key names a queue, response not recorded"
                    );
                } else if let Err(e) = self
                    .responses
                    .put_response(&response_key, &response.body)
                    .await
                {
                    warn!(
                        message = %message.name,
                        key = %response_key,
                        error = %e,
                        "Failed to record response"
                    );
                }

                match route(response.status, &self.dead_codes) {
                    Some(dead_key) => {
                        warn!(
                            message = %message.name,
                            status = response.status,
                            dead_queue = %dead_key,
                            "Request failed, filing into dead-letter queue"
                        );
                        self.store.append(&dead_key, message).await?;
                        MessageOutcome::DeadLettered {
                            status: response.status,
                            queue: dead_key,
                        }
                    }
                    None => {
                        debug!(message = %message.name, status = response.status, "Request completed");
                        MessageOutcome::Completed {
                            status: response.status,
                        }
                    }
                }
            }
        };

        Ok(outcome)
    }
}
