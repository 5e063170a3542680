//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log level, format and optional shipping target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Log level filter, e.g. `info` or `faultline=debug,info`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `text` for human-readable output, `json` for structured logs
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Optional UDP `host:port` of a log collector; when unreachable the
    /// proxy falls back to stderr with a warning
    #[serde(default)]
    pub logstash_addr: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl TelemetrySettings {
    /// Whether JSON output was requested
    #[must_use]
    pub fn wants_json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            logstash_addr: None,
        }
    }
}
