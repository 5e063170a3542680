//! HTTP implementation of the upstream forwarding port
//!
//! Carries surviving messages to their destination service over
//! `reqwest`. Message headers travel as-is - the tracking header among
//! them, verbatim, so a chain of proxies converges on the same
//! experiment id. Hop-by-hop headers are stripped; the client computes
//! its own framing.

use std::collections::HashMap;
use std::time::Duration;

use application::ports::{UpstreamError, UpstreamPort, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{debug, instrument};

/// Headers owned by each hop rather than the end-to-end message
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Configuration for the upstream HTTP client
#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            user_agent: format!("faultline/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl UpstreamClientConfig {
    /// Set the whole-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// `reqwest`-backed upstream transport
///
/// Routes by destination service name through a static table configured
/// at startup. Dropping the forwarding future (caller cancellation)
/// aborts the in-flight request, so no sockets leak.
#[derive(Debug)]
pub struct HttpUpstream {
    client: Client,
    routes: HashMap<String, String>,
}

impl HttpUpstream {
    /// Build the transport with default client settings
    ///
    /// # Errors
    ///
    /// Returns the builder's error when the TLS backend cannot initialize.
    pub fn new(routes: HashMap<String, String>) -> Result<Self, reqwest::Error> {
        Self::with_config(UpstreamClientConfig::default(), routes)
    }

    /// Build the transport with custom client settings
    ///
    /// # Errors
    ///
    /// Returns the builder's error when the TLS backend cannot initialize.
    pub fn with_config(
        config: UpstreamClientConfig,
        routes: HashMap<String, String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, routes })
    }
}

#[async_trait]
impl UpstreamPort for HttpUpstream {
    #[instrument(skip(self, request), fields(dest = %request.message.dest))]
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let dest = request.message.dest.as_str();
        let base = self
            .routes
            .get(dest)
            .ok_or_else(|| UpstreamError::UnknownDestination(dest.to_string()))?;
        let url = format!(
            "{}{}",
            base.trim_end_matches('/'),
            request.path_and_query
        );

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.message.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name, value);
            }
        }

        debug!(%url, "forwarding message upstream");
        let response = builder
            .body(request.message.body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

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
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_detection_is_case_insensitive() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("CONTENT-LENGTH"));
        assert!(is_hop_by_hop("host"));
        assert!(!is_hop_by_hop("X-Experiment-Id"));
        assert!(!is_hop_by_hop("content-type"));
    }

    #[test]
    fn config_defaults() {
        let config = UpstreamClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("faultline/"));
    }

    #[test]
    fn config_builders_chain() {
        let config = UpstreamClientConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn client_builds_with_routes() {
        let routes: HashMap<String, String> =
            [("reviews".to_string(), "http://reviews:9080".to_string())]
                .into_iter()
                .collect();
        assert!(HttpUpstream::new(routes).is_ok());
    }
}
