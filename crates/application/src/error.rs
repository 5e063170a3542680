//! Application-level errors

use thiserror::Error;

use crate::ports::UpstreamError;

/// Errors that terminate an in-flight message
///
/// Neither variant produces a fault-code abort; the message simply ends
/// and the transport error (if any) is surfaced verbatim.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The caller cancelled the message while it was in the pipeline
    #[error("message cancelled")]
    Cancelled,

    /// Forwarding to the upstream failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
