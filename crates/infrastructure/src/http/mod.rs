//! HTTP transport adapters

mod upstream_client;

pub use upstream_client::{HttpUpstream, UpstreamClientConfig};
