//! Upstream forwarding port
//!
//! The front-end hands a surviving message to this port; the transport
//! adapter carries it to the destination service and brings the reply
//! back. The tracking header travels verbatim in the message's headers.

use async_trait::async_trait;
use domain::ProxyMessage;
use thiserror::Error;

/// Forwarding failures
///
/// These terminate the message without a fault-code abort; the transport
/// error is surfaced to the caller verbatim.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No upstream is configured for the destination service
    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    /// The transport failed to deliver the message or read the reply
    #[error("upstream transport error: {0}")]
    Transport(String),
}

/// A message ready to leave the proxy, plus its transport envelope
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// The (possibly mangled) message to deliver
    pub message: ProxyMessage,
    /// Transport verb, e.g. `GET`
    pub method: String,
    /// Path and query to request on the destination, e.g. `/reviews?page=2`
    pub path_and_query: String,
}

/// The reply a forwarded message produced
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// Transport status code
    pub status: u16,
    /// Reply headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Reply payload
    pub body: String,
}

/// Carries surviving messages to their destination service
#[async_trait]
pub trait UpstreamPort: Send + Sync {
    /// Deliver the message and return the reply
    ///
    /// # Errors
    ///
    /// [`UpstreamError`] when the destination is unknown or the transport
    /// fails. Cancelling the caller drops this future and with it the
    /// in-flight transport request.
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}
