//! The wire seam under [`HttpHandler`](crate::HttpHandler).
//!
//! Everything above this module deals in [`OutboundRequest`] and
//! [`UpstreamResponse`]; only [`ReqwestTransport`] touches the network, so the
//! retry and error-mapping logic can be driven by a scripted transport in tests.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use thiserror::Error;

/// The request couldn't be sent, or its response couldn't be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    /// JSON-encoded body, absent for GET and DELETE.
    pub body: Option<Vec<u8>>,
}

impl OutboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        (**self).send(request).await
    }
}

/// [`Transport`] over a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new(format!("failed to create client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.header("content-type", "application/json").body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(format!("request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new(format!("failed to read body: {e}")))?;

        Ok(UpstreamResponse { status, body })
    }
}
