#![forbid(unsafe_code)]
//! Infrastructure layer - adapters for external systems
//!
//! Implements the ports defined in the application layer: configuration
//! loading, the HTTP upstream transport and telemetry bootstrap.

pub mod config;
pub mod http;
pub mod telemetry;

pub use self::config::{
    AppConfig, ConfigValidationError, ProxySettings, ServerConfig, TelemetrySettings,
};
pub use self::http::{HttpUpstream, UpstreamClientConfig};
pub use self::telemetry::init_telemetry;
