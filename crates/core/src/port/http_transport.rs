// HTTP Transport Port
// Abstraction over the outbound HTTP client

use crate::domain::Message;
use async_trait::async_trait;
use thiserror::Error;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Fully built outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl OutboundRequest {
    /// Build the request described by a queued message
    ///
    /// Params are form-encoded into the body for POST and PUT only. Headers
    /// are attached verbatim; a form content type is added when a body is
    /// present and the message does not set one.
    pub fn from_message(message: &Message) -> Self {
        let body = message.carries_body().then(|| message.encoded_params());

        let mut headers: Vec<(String, String)> = message
            .headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
            .collect();

        if body.is_some() && !message.has_header("content-type") {
            headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
        }

        Self {
            method: message.normalized_method(),
            url: message.url.clone(),
            body,
            headers,
        }
    }
}

/// Response with the body already read in full, as raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Transport-level failures (no status code was obtained)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

/// HTTP Transport trait
///
/// Implementations:
/// - ReqwestTransport: real network client
/// - MockTransport: scripted replies (tests)
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request and read the body fully
    ///
    /// # Errors
    /// - TransportError::Connect if the peer cannot be reached
    /// - TransportError::Timeout if the configured timeout elapses
    /// - TransportError::Body if the body cannot be read
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Scripted reply for one URL
    #[derive(Debug, Clone)]
    pub enum MockReply {
        Status(u16, Vec<u8>),
        Fail(TransportError),
    }

    type SendHook = Box<dyn Fn(&OutboundRequest) + Send + Sync>;

    /// Mock HTTP Transport for testing
    ///
    /// URLs without a scripted reply fail with `TransportError::Connect`.
    #[derive(Default)]
    pub struct MockTransport {
        replies: Mutex<HashMap<String, MockReply>>,
        calls: Arc<Mutex<Vec<OutboundRequest>>>,
        hook: Option<SendHook>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Run `hook` on every send, before the reply is produced
        pub fn with_hook(mut self, hook: impl Fn(&OutboundRequest) + Send + Sync + 'static) -> Self {
            self.hook = Some(Box::new(hook));
            self
        }

        /// Script (or re-script) a status reply for `url`
        pub fn respond(&self, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) {
            self.replies
                .lock()
                .unwrap()
                .insert(url.into(), MockReply::Status(status, body.into()));
        }

        /// Script a transport failure for `url`
        pub fn fail(&self, url: impl Into<String>, error: TransportError) {
            self.replies
                .lock()
                .unwrap()
                .insert(url.into(), MockReply::Fail(error));
        }

        pub fn calls(&self) -> Vec<OutboundRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(hook) = &self.hook {
                hook(request);
            }

            let reply = self.replies.lock().unwrap().get(&request.url).cloned();
            match reply {
                Some(MockReply::Status(status, body)) => Ok(HttpResponse {
                    status,
                    headers: Vec::new(),
                    body,
                }),
                Some(MockReply::Fail(err)) => Err(err),
                None => Err(TransportError::Connect(format!(
                    "connection refused: {}",
                    request.url
                ))),
            }
        }
    }
}
