// reqwest transport implementation
use async_trait::async_trait;
use deadletter_core::config::HttpConfig;
use deadletter_core::port::http_transport::{
    HttpResponse, HttpTransport, OutboundRequest, TransportError,
};
use reqwest::Method;
use std::time::Duration;
use tracing::debug;

/// HTTP transport backed by a shared reqwest client
///
/// The configured timeout bounds the whole exchange, so a hung peer cannot
/// stall a pass indefinitely.
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl ReqwestTransport {
    /// Create a new transport
    ///
    /// # Example
    /// ```ignore
    /// let transport = ReqwestTransport::new(&HttpConfig { timeout_ms: 5_000 })?;
    /// ```
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build client: {}", e)))?;
        Ok(Self {
            client,
            timeout_ms: config.timeout_ms,
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout_ms)
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            TransportError::InvalidRequest(format!("invalid method '{}'", request.method))
        })?;

        let mut builder = self.client.request(method, request.url.as_str());
        // header() appends, so repeated names keep every value
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        // Raw bytes: no charset decoding, no replacement of invalid UTF-8
        let body = response.bytes().await.map_err(|e| match self.classify(e) {
            TransportError::Timeout(ms) => TransportError::Timeout(ms),
            other => TransportError::Body(other.to_string()),
        })?
        .to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "HTTP request completed");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
