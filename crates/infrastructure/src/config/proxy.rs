//! Proxy identity and routing configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Who this proxy fronts and where its upstreams live
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxySettings {
    /// The service this proxy acts for; becomes the `source` of every
    /// message it originates
    #[serde(default)]
    pub service_name: String,

    /// Header whose presence marks a message as under experiment
    ///
    /// Required and deliberately without a default: every proxy in a chain
    /// must agree on the name, so the operator has to choose it.
    #[serde(default)]
    pub tracking_header: String,

    /// Destination service name to base URL, e.g.
    /// `reviews = "http://reviews:9080"`
    #[serde(default)]
    pub upstreams: HashMap<String, String>,
}

impl ProxySettings {
    /// Base URL for a destination service, if routed
    #[must_use]
    pub fn upstream_for(&self, dest: &str) -> Option<&str> {
        self.upstreams.get(dest).map(String::as_str)
    }
}
