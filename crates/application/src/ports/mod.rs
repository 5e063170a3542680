//! Ports to the outside world
//!
//! The application layer defines the interfaces; adapters in the
//! infrastructure layer implement them.

mod upstream;

pub use upstream::{UpstreamError, UpstreamPort, UpstreamRequest, UpstreamResponse};
