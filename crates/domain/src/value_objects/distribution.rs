//! Probability distribution kinds for fault sampling

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// The shape of a fault's probability spread across repeated trials
///
/// The kind controls how delay, mangle and abort decisions and delay
/// durations spread over many messages; the configured probability and
/// mean stay the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    /// Flat distribution; durations are a point mass at the mean
    #[default]
    Uniform,
    /// Exponential distribution
    Exponential,
    /// Normal (Gaussian) distribution
    Normal,
}

impl DistributionKind {
    /// Canonical lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Exponential => "exponential",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DistributionKind {
    type Err = DomainError;

    /// The empty string maps to `Uniform`, matching an unset config field
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" | "" => Ok(Self::Uniform),
            "exponential" => Ok(Self::Exponential),
            "normal" => Ok(Self::Normal),
            other => Err(DomainError::UnknownDistribution(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_kinds() {
        assert_eq!("uniform".parse::<DistributionKind>().unwrap(), DistributionKind::Uniform);
        assert_eq!(
            "exponential".parse::<DistributionKind>().unwrap(),
            DistributionKind::Exponential
        );
        assert_eq!("normal".parse::<DistributionKind>().unwrap(), DistributionKind::Normal);
    }

    #[test]
    fn empty_string_defaults_to_uniform() {
        assert_eq!("".parse::<DistributionKind>().unwrap(), DistributionKind::Uniform);
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!("Normal".parse::<DistributionKind>().unwrap(), DistributionKind::Normal);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "gaussian".parse::<DistributionKind>().unwrap_err();
        assert!(matches!(err, DomainError::UnknownDistribution(s) if s == "gaussian"));
    }

    #[test]
    fn default_is_uniform() {
        assert_eq!(DistributionKind::default(), DistributionKind::Uniform);
    }

    #[test]
    fn display_round_trips() {
        for kind in [
            DistributionKind::Uniform,
            DistributionKind::Exponential,
            DistributionKind::Normal,
        ] {
            assert_eq!(kind.to_string().parse::<DistributionKind>().unwrap(), kind);
        }
    }
}
