//! Outbound HTTP seam used by the wire adapters.
//!
//! Adapters never touch `reqwest` directly; they hand an [`OutboundRequest`]
//! to an [`HttpTransport`]. Production uses [`ReqwestTransport`]; tests
//! substitute a scripted implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

/// A fully rendered request to a provider.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl OutboundRequest {
    /// JSON `POST` with no extra headers.
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Add a bearer `Authorization` header.
    #[must_use]
    pub fn bearer(mut self, token: &str) -> Self {
        self.headers
            .push(("authorization".to_string(), format!("Bearer {token}")));
        self
    }

    /// Value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a provider response. Any status is returned; the
/// caller decides what counts as failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    pub status: u16,
    pub body: String,
}

/// Failures below the HTTP layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The call exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or body read failure.
    #[error("transport error: {0}")]
    Other(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    /// Send the request and return whatever the server answered.
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client with a per-call
/// timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose calls time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { http })
    }
}

fn classify(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Other(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        let mut rb = self
            .http
            .request(request.method, &request.url)
            .json(&request.body);
        for (name, value) in &request.headers {
            rb = rb.header(name.as_str(), value.as_str());
        }

        let resp = rb.send().await.map_err(|e| classify(&e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| classify(&e))?;
        Ok(InboundResponse { status, body })
    }
}
