//! Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;

use application::ports::UpstreamPort;
use application::{Matcher, RuleRegistry, SamplerSource};
use domain::ServiceName;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The rule registry, mutated by the control plane
    pub registry: Arc<RuleRegistry>,
    /// Rule selection, gated on the tracking header
    pub matcher: Arc<Matcher>,
    /// Transport to destination services
    pub upstream: Arc<dyn UpstreamPort>,
    /// This proxy's own service identity; the `source` of every message
    pub service_name: ServiceName,
    /// Root of the per-message sampler chain
    pub samplers: Arc<SamplerSource>,
    /// Maximum wall-clock time to process one message; expiry cancels it
    pub request_timeout: Duration,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("rules", &self.registry.len())
            .field("tracking_header", &self.matcher.tracking_header())
            .field("service_name", &self.service_name)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}
