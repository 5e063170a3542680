//! Fault rule entity and its on-wire configuration record
//!
//! A [`RuleConfig`] is the raw, string-typed record that travels over the
//! control plane and in the config file. A [`Rule`] is the frozen runtime
//! form: patterns compiled, names resolved, durations parsed. Conversion
//! happens once at the boundary via [`Rule::from_config`], and a rule is
//! never mutated afterwards; updating a rule means removing and re-adding.

use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::duration::{format_duration, parse_duration};
use crate::errors::{DomainError, PatternField};
use crate::value_objects::{DistributionKind, MessageType, ServiceName};

/// String-typed rule record, as accepted and returned by the control plane
///
/// Unknown fields are rejected so an operator typo never silently produces
/// a rule without the intended fault.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    /// Calling service
    pub source: String,
    /// Called service
    pub dest: String,
    /// Message leg this rule applies to: request, response, publish, subscribe
    pub mtype: String,
    /// Regex matched against the message's header block; required
    pub header_pattern: String,
    /// Regex matched against the message body; empty means match anything
    pub body_pattern: String,

    /// Probability of the delay stage firing, in [0, 1]
    pub delay_probability: f64,
    /// Distribution shaping the delay gate and duration; empty means uniform
    pub delay_distribution: String,
    /// Mean delay as a duration string, e.g. "100ms"
    pub delay_time: String,

    /// Probability of the mangle stage firing, in [0, 1]
    pub mangle_probability: f64,
    /// Distribution shaping the mangle gate; empty means uniform
    pub mangle_distribution: String,
    /// Regex searched for in the body when mangling
    pub search_pattern: String,
    /// Replacement template; `$1`-style back-references are honored
    pub replace_template: String,

    /// Probability of the abort stage firing, in [0, 1]
    pub abort_probability: f64,
    /// Distribution shaping the abort gate; empty means uniform
    pub abort_distribution: String,
    /// Status code of the synthesized abort response
    pub error_code: u16,
}

/// A validated, frozen fault specification
///
/// The disabled sentinel [`Rule::nop`] stands in wherever "no rule applies"
/// must be expressed as a value; it never matches and injects nothing.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Disabled rules never match
    pub enabled: bool,
    /// Calling service
    pub source: ServiceName,
    /// Called service
    pub dest: ServiceName,
    /// Message leg this rule applies to
    pub mtype: MessageType,
    /// Compiled header-block pattern
    pub header_pattern: Regex,
    /// Compiled body pattern
    pub body_pattern: Regex,

    /// Delay stage gate probability
    pub delay_probability: f64,
    /// Delay stage distribution
    pub delay_distribution: DistributionKind,
    /// Mean delay duration
    pub delay_time: Duration,

    /// Mangle stage gate probability
    pub mangle_probability: f64,
    /// Mangle stage distribution
    pub mangle_distribution: DistributionKind,
    /// Compiled mangle search pattern
    pub search_pattern: Regex,
    /// Mangle replacement template
    pub replace_template: String,

    /// Abort stage gate probability
    pub abort_probability: f64,
    /// Abort stage distribution
    pub abort_distribution: DistributionKind,
    /// Status code of the synthesized abort response
    pub error_code: u16,
}

/// A pattern every input matches; the literal cannot fail to compile
fn match_anything() -> Regex {
    #[allow(clippy::expect_used)]
    Regex::new(".*").expect("literal pattern compiles")
}

/// A pattern no input matches, for the disabled sentinel
fn match_nothing() -> Regex {
    #[allow(clippy::expect_used)]
    Regex::new("[^\\s\\S]").expect("literal pattern compiles")
}

impl Rule {
    /// The disabled sentinel rule
    #[must_use]
    pub fn nop() -> Self {
        Self {
            enabled: false,
            source: ServiceName::new("-").unwrap_or_else(|_| unreachable!()),
            dest: ServiceName::new("-").unwrap_or_else(|_| unreachable!()),
            mtype: MessageType::Unknown,
            header_pattern: match_nothing(),
            body_pattern: match_nothing(),
            delay_probability: 0.0,
            delay_distribution: DistributionKind::Uniform,
            delay_time: Duration::ZERO,
            mangle_probability: 0.0,
            mangle_distribution: DistributionKind::Uniform,
            search_pattern: match_nothing(),
            replace_template: String::new(),
            abort_probability: 0.0,
            abort_distribution: DistributionKind::Uniform,
            error_code: 0,
        }
    }

    /// Build a validated rule from its string-typed config record
    ///
    /// # Errors
    ///
    /// Any validation failure yields the specific [`DomainError`]; the
    /// caller falls back to [`Rule::nop`] where a value is needed.
    pub fn from_config(config: &RuleConfig) -> Result<Self, DomainError> {
        let source = ServiceName::new(config.source.clone())?;
        let dest = ServiceName::new(config.dest.clone())?;

        if config.header_pattern.is_empty() {
            return Err(DomainError::PatternRequired(PatternField::Header));
        }
        let header_pattern = Regex::new(&config.header_pattern)
            .map_err(|e| DomainError::pattern_invalid(PatternField::Header, &e))?;

        let body_pattern = if config.body_pattern.is_empty() {
            match_anything()
        } else {
            Regex::new(&config.body_pattern)
                .map_err(|e| DomainError::pattern_invalid(PatternField::Body, &e))?
        };

        if config.delay_probability <= 0.0
            && config.mangle_probability <= 0.0
            && config.abort_probability <= 0.0
        {
            return Err(DomainError::NoFaultConfigured);
        }

        let mtype = MessageType::from_str(&config.mtype)?;

        let delay_distribution = DistributionKind::from_str(&config.delay_distribution)?;
        let delay_time = if config.delay_time.is_empty() {
            Duration::ZERO
        } else {
            parse_duration(&config.delay_time)?
        };

        let mangle_distribution = DistributionKind::from_str(&config.mangle_distribution)?;
        let search_pattern = if config.search_pattern.is_empty() {
            match_anything()
        } else {
            Regex::new(&config.search_pattern)
                .map_err(|e| DomainError::pattern_invalid(PatternField::Search, &e))?
        };

        let abort_distribution = DistributionKind::from_str(&config.abort_distribution)?;
        if config.abort_probability > 0.0 && !(100..=599).contains(&config.error_code) {
            return Err(DomainError::InvalidStatusCode(config.error_code));
        }

        Ok(Self {
            enabled: true,
            source,
            dest,
            mtype,
            header_pattern,
            body_pattern,
            delay_probability: config.delay_probability,
            delay_distribution,
            delay_time,
            mangle_probability: config.mangle_probability,
            mangle_distribution,
            search_pattern,
            replace_template: config.replace_template.clone(),
            abort_probability: config.abort_probability,
            abort_distribution,
            error_code: config.error_code,
        })
    }

    /// Render the rule back into its string-typed config record
    #[must_use]
    pub fn to_config(&self) -> RuleConfig {
        RuleConfig {
            source: self.source.to_string(),
            dest: self.dest.to_string(),
            mtype: self.mtype.to_string(),
            header_pattern: self.header_pattern.as_str().to_string(),
            body_pattern: self.body_pattern.as_str().to_string(),
            delay_probability: self.delay_probability,
            delay_distribution: self.delay_distribution.to_string(),
            delay_time: format_duration(self.delay_time),
            mangle_probability: self.mangle_probability,
            mangle_distribution: self.mangle_distribution.to_string(),
            search_pattern: self.search_pattern.as_str().to_string(),
            replace_template: self.replace_template.clone(),
            abort_probability: self.abort_probability,
            abort_distribution: self.abort_distribution.to_string(),
            error_code: self.error_code,
        }
    }
}

/// Field-wise equality; regexes compare by pattern source
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.enabled == other.enabled
            && self.source == other.source
            && self.dest == other.dest
            && self.mtype == other.mtype
            && self.header_pattern.as_str() == other.header_pattern.as_str()
            && self.body_pattern.as_str() == other.body_pattern.as_str()
            && self.delay_probability == other.delay_probability
            && self.delay_distribution == other.delay_distribution
            && self.delay_time == other.delay_time
            && self.mangle_probability == other.mangle_probability
            && self.mangle_distribution == other.mangle_distribution
            && self.search_pattern.as_str() == other.search_pattern.as_str()
            && self.replace_template == other.replace_template
            && self.abort_probability == other.abort_probability
            && self.abort_distribution == other.abort_distribution
            && self.error_code == other.error_code
    }
}
