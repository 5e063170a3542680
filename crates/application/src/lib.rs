#![forbid(unsafe_code)]
//! Application layer - rule engine and fault pipeline
//!
//! Holds the moving parts of the proxy core: the rule registry, the
//! matcher that picks at most one rule per message, the three-stage fault
//! pipeline and the probability sampler behind its gates. Transport
//! concerns live behind the [`ports::UpstreamPort`] trait; adapters in the
//! infrastructure layer implement it.

pub mod cancel;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod sampler;

pub use cancel::CancelToken;
pub use error::ProxyError;
pub use matcher::Matcher;
pub use pipeline::{FaultOutcome, apply_rule};
pub use ports::{UpstreamError, UpstreamPort, UpstreamRequest, UpstreamResponse};
pub use registry::RuleRegistry;
pub use sampler::{Sampler, SamplerSource};
