//! The HTTP transport seam.
//!
//! [`Transport`] decouples the request pipeline from the HTTP client so
//! tests can inject scripted responses. [`UreqTransport`] is the
//! production implementation over a pooled [`ureq::Agent`].

use std::time::Duration;

use ureq::Agent;

/// HTTP method for a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully-formed request handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    /// Header name/value pairs, already merged with any custom headers.
    pub headers: Vec<(String, String)>,
    /// Request body; only present for POST.
    pub body: Option<Vec<u8>>,
}

/// A raw response from the transport. Status is reported as data, never
/// as an error — classification is the pipeline's job.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Network-level failure: timeout, connection refused, aborted exchange.
/// Retryable by the pipeline.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// One HTTP exchange. Implementations must not retry internally.
pub trait Transport: Send + Sync {
    /// Execute the request and return the raw response.
    ///
    /// Non-2xx statuses are returned as `Ok` responses; `Err` is
    /// reserved for failures where no HTTP response was obtained.
    fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Production transport over a pooled [`ureq::Agent`].
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Create a transport with a per-attempt timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let response = match request.method {
            Method::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            Method::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                let body = request.body.as_deref().unwrap_or_default();
                builder.send(body)
            }
        }
        .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let body = response
            .into_body()
            .read_to_vec()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}
