//! Rule selection for in-flight messages
//!
//! At most one rule applies to a message. A message not carrying the
//! tracking header is not under experiment and always gets the disabled
//! sentinel; otherwise the first enabled rule in the message's bucket
//! whose patterns both match wins, in insertion order.

use std::sync::Arc;

use domain::{ProxyMessage, Rule};
use tracing::{debug, trace};

use crate::registry::RuleRegistry;

/// Selects at most one applicable rule per message
#[derive(Debug, Clone)]
pub struct Matcher {
    tracking_header: String,
    nop: Arc<Rule>,
}

impl Matcher {
    /// Create a matcher gated on the given tracking header name
    pub fn new(tracking_header: impl Into<String>) -> Self {
        Self {
            tracking_header: tracking_header.into(),
            nop: Arc::new(Rule::nop()),
        }
    }

    /// The configured tracking header name
    #[must_use]
    pub fn tracking_header(&self) -> &str {
        &self.tracking_header
    }

    /// Pick the rule for this message, or the disabled sentinel
    ///
    /// Deterministic for a fixed registry and message: candidates are
    /// scanned in insertion order and the first full match is returned.
    #[must_use]
    pub fn select(&self, registry: &RuleRegistry, message: &ProxyMessage) -> Arc<Rule> {
        let under_experiment = message
            .header(&self.tracking_header)
            .is_some_and(|value| !value.is_empty());
        if !under_experiment {
            trace!(
                source = %message.source,
                dest = %message.dest,
                "message not under experiment"
            );
            return Arc::clone(&self.nop);
        }

        let header_block = message.header_block();
        for candidate in registry.lookup(&message.source, &message.dest, message.mtype) {
            if candidate.enabled
                && candidate.header_pattern.is_match(&header_block)
                && candidate.body_pattern.is_match(&message.body)
            {
                debug!(
                    source = %message.source,
                    dest = %message.dest,
                    mtype = %message.mtype,
                    "rule matched"
                );
                return candidate;
            }
        }
        Arc::clone(&self.nop)
    }
}

#[cfg(test)]
mod tests {
    use domain::{MessageType, RuleConfig, ServiceName};

    use super::*;

    const TRACKING: &str = "X-Experiment-Id";

    fn registry_with(configs: &[RuleConfig]) -> RuleRegistry {
        let registry = RuleRegistry::new();
        for config in configs {
            assert!(registry.add(Rule::from_config(config).unwrap()));
        }
        registry
    }

    fn config(body_pattern: &str, error_code: u16) -> RuleConfig {
        RuleConfig {
            source: "productpage".to_string(),
            dest: "reviews".to_string(),
            mtype: "request".to_string(),
            header_pattern: ".*".to_string(),
            body_pattern: body_pattern.to_string(),
            abort_probability: 1.0,
            error_code,
            ..RuleConfig::default()
        }
    }

    fn message(headers: Vec<(String, String)>, body: &str) -> ProxyMessage {
        ProxyMessage::new(
            ServiceName::new("productpage").unwrap(),
            ServiceName::new("reviews").unwrap(),
            MessageType::Request,
            headers,
            body.to_string(),
        )
    }

    fn tracked(body: &str) -> ProxyMessage {
        message(vec![(TRACKING.to_string(), "exp-1".to_string())], body)
    }

    #[test]
    fn message_without_tracking_header_gets_nop() {
        let registry = registry_with(&[config("", 503)]);
        let matcher = Matcher::new(TRACKING);
        let selected = matcher.select(&registry, &message(vec![], "payload"));
        assert!(!selected.enabled);
    }

    #[test]
    fn empty_tracking_header_value_gets_nop() {
        let registry = registry_with(&[config("", 503)]);
        let matcher = Matcher::new(TRACKING);
        let msg = message(vec![(TRACKING.to_string(), String::new())], "payload");
        assert!(!matcher.select(&registry, &msg).enabled);
    }

    #[test]
    fn tracked_message_matches_rule() {
        let registry = registry_with(&[config("", 503)]);
        let matcher = Matcher::new(TRACKING);
        let selected = matcher.select(&registry, &tracked("payload"));
        assert!(selected.enabled);
        assert_eq!(selected.error_code, 503);
    }

    #[test]
    fn tracking_header_name_is_case_insensitive() {
        let registry = registry_with(&[config("", 503)]);
        let matcher = Matcher::new(TRACKING);
        let msg = message(
            vec![("x-experiment-id".to_string(), "exp-1".to_string())],
            "payload",
        );
        assert!(matcher.select(&registry, &msg).enabled);
    }

    #[test]
    fn body_pattern_filters_candidates() {
        let registry = registry_with(&[config("checkout", 503)]);
        let matcher = Matcher::new(TRACKING);
        assert!(!matcher.select(&registry, &tracked("browse")).enabled);
        assert!(matcher.select(&registry, &tracked("checkout now")).enabled);
    }

    #[test]
    fn header_pattern_matches_the_header_block() {
        let mut selective = config("", 501);
        selective.header_pattern = "X-Experiment-Id: exp-7".to_string();
        let registry = registry_with(&[selective]);
        let matcher = Matcher::new(TRACKING);

        assert!(!matcher.select(&registry, &tracked("payload")).enabled);
        let msg = message(vec![(TRACKING.to_string(), "exp-7".to_string())], "payload");
        assert!(matcher.select(&registry, &msg).enabled);
    }

    #[test]
    fn first_inserted_rule_wins_ties() {
        let registry = registry_with(&[config("", 501), config("", 502)]);
        let matcher = Matcher::new(TRACKING);
        assert_eq!(matcher.select(&registry, &tracked("x")).error_code, 501);
    }

    #[test]
    fn selection_is_deterministic_across_calls() {
        let registry = registry_with(&[config("", 501), config("", 502)]);
        let matcher = Matcher::new(TRACKING);
        let msg = tracked("x");
        let first = matcher.select(&registry, &msg);
        for _ in 0..50 {
            assert_eq!(*matcher.select(&registry, &msg), *first);
        }
    }

    #[test]
    fn non_matching_first_rule_falls_through_to_second() {
        let registry = registry_with(&[config("never-present", 501), config("", 502)]);
        let matcher = Matcher::new(TRACKING);
        assert_eq!(matcher.select(&registry, &tracked("x")).error_code, 502);
    }

    #[test]
    fn empty_registry_yields_nop() {
        let registry = RuleRegistry::new();
        let matcher = Matcher::new(TRACKING);
        assert!(!matcher.select(&registry, &tracked("x")).enabled);
    }
}
