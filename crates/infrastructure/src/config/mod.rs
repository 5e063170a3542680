//! Application configuration
//!
//! Split into focused sub-modules:
//! - `server`: HTTP listener settings
//! - `proxy`: proxy identity, tracking header, upstream routes
//! - `telemetry`: log level, format and optional log shipping
//!
//! Loaded from an optional `faultline.toml` next to the binary, overridden
//! by `FAULTLINE_*` environment variables. The initial rule set rides
//! along in the same file and is applied to the registry at startup.

mod proxy;
mod server;
mod telemetry;

use domain::RuleConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use proxy::ProxySettings;
pub use server::ServerConfig;
pub use telemetry::TelemetrySettings;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Proxy identity and routing
    #[serde(default)]
    pub proxy: ProxySettings,

    /// Logging settings
    #[serde(default)]
    pub telemetry: TelemetrySettings,

    /// Rules applied at startup; any invalid rule aborts startup
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Problems that make a loaded configuration unusable
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    /// No tracking header configured; the proxy cannot correlate experiments
    #[error("proxy.tracking_header must be set and non-empty")]
    MissingTrackingHeader,

    /// The proxy needs its own service identity for rule matching
    #[error("proxy.service_name must be set and non-empty")]
    MissingServiceName,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns the loader's error when a present file is unreadable or a
    /// value does not deserialize.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("faultline")
    }

    /// Load configuration from a named file (without extension) and environment
    ///
    /// # Errors
    ///
    /// Returns the loader's error when a present file is unreadable or a
    /// value does not deserialize.
    pub fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("FAULTLINE")
                    .separator("__")
                    .try_parsing(true),
            );
        builder.build()?.try_deserialize()
    }

    /// Check the invariants the loader cannot express
    ///
    /// # Errors
    ///
    /// [`ConfigValidationError`] naming the missing field; these are fatal
    /// at startup.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.proxy.tracking_header.trim().is_empty() {
            return Err(ConfigValidationError::MissingTrackingHeader);
        }
        if self.proxy.service_name.trim().is_empty() {
            return Err(ConfigValidationError::MissingServiceName);
        }
        Ok(())
    }
}
