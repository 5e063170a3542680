//! Domain-level errors

use std::fmt;

use thiserror::Error;

/// Which regex field of a rule an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternField {
    /// The header matching pattern
    Header,
    /// The body matching pattern
    Body,
    /// The mangle search pattern
    Search,
}

impl fmt::Display for PatternField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Body => write!(f, "body"),
            Self::Search => write!(f, "search"),
        }
    }
}

/// Errors that can occur while constructing domain values
///
/// All of these surface from rule construction; they reject the rule and
/// never reach the data plane.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A regex pattern failed to compile
    #[error("invalid {field} pattern: {reason}")]
    PatternInvalid {
        field: PatternField,
        reason: String,
    },

    /// A required regex pattern was left empty
    #[error("{0} pattern is required")]
    PatternRequired(PatternField),

    /// Unrecognized probability distribution name
    #[error("unknown probability distribution: {0:?}")]
    UnknownDistribution(String),

    /// Unrecognized message type name
    #[error("unsupported message type: {0:?}")]
    UnsupportedMessageType(String),

    /// A duration string could not be parsed
    #[error("invalid duration: {0}")]
    DurationParseError(String),

    /// All three fault probabilities are zero
    #[error("at least one of delay, mangle and abort probability must be positive")]
    NoFaultConfigured,

    /// The abort status code is not a valid transport status
    #[error("invalid status code: {0}")]
    InvalidStatusCode(u16),

    /// A service identifier was empty
    #[error("service name must not be empty")]
    EmptyServiceName,
}

impl DomainError {
    /// Create a pattern compilation error for the given field
    pub fn pattern_invalid(field: PatternField, err: &regex::Error) -> Self {
        Self::PatternInvalid {
            field,
            reason: err.to_string(),
        }
    }
}
