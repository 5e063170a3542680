#![forbid(unsafe_code)]
//! Domain layer - fault-injection vocabulary
//!
//! Pure value objects and entities for the proxy core: message types,
//! probability distribution kinds, fault rules and the in-flight message
//! shape. No I/O and no async; everything here is constructed, validated
//! and then frozen.

pub mod duration;
pub mod entities;
pub mod errors;
pub mod value_objects;

pub use duration::{format_duration, parse_duration};
pub use entities::{ProxyMessage, Rule, RuleConfig};
pub use errors::{DomainError, PatternField};
pub use value_objects::{DistributionKind, MessageType, ServiceName};
