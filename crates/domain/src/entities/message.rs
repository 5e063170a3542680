//! The in-flight message shape the proxy core consumes
//!
//! The transport layer reduces a request or response to this value before
//! matching and fault injection; whatever framing carried it is no concern
//! of the core.

use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageType, ServiceName};

/// One traversing message, on either the request or the reply leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyMessage {
    /// Service the message originates from
    pub source: ServiceName,
    /// Service the message is addressed to
    pub dest: ServiceName,
    /// Which leg this message travels on
    pub mtype: MessageType,
    /// Transport headers in arrival order; names may repeat
    pub headers: Vec<(String, String)>,
    /// Message payload
    pub body: String,
}

impl ProxyMessage {
    /// Assemble a message
    #[must_use]
    pub fn new(
        source: ServiceName,
        dest: ServiceName,
        mtype: MessageType,
        headers: Vec<(String, String)>,
        body: String,
    ) -> Self {
        Self {
            source,
            dest,
            mtype,
            headers,
            body,
        }
    }

    /// First value of the named header, matched case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The concatenated header block that header patterns match against,
    /// one `name: value` pair per line
    #[must_use]
    pub fn header_block(&self) -> String {
        let mut block = String::new();
        for (name, value) in &self.headers {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push('\n');
        }
        block
    }

    /// Append a header pair
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }
}
