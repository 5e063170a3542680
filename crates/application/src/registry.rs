//! Per-proxy rule registry
//!
//! Rules live in buckets keyed by `(source, dest, mtype)`. The data-plane
//! hot path only ever takes the read side of the lock, clones the bucket's
//! `Arc` handles and releases it; writers on the rare control-plane path
//! serialize among themselves. No lock is held across an await.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{MessageType, Rule, ServiceName};
use parking_lot::RwLock;
use tracing::{debug, info};

/// Bucket key: the triple a message is looked up by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    source: ServiceName,
    dest: ServiceName,
    mtype: MessageType,
}

impl BucketKey {
    fn of(rule: &Rule) -> Self {
        Self {
            source: rule.source.clone(),
            dest: rule.dest.clone(),
            mtype: rule.mtype,
        }
    }
}

/// Keyed collection of fault rules with atomic add/remove/lookup
///
/// Empty at startup, mutated only through these operations, gone at
/// shutdown. Rules are immutable once stored; "updating" one is a remove
/// followed by an add.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    buckets: RwLock<HashMap<BucketKey, Vec<Arc<Rule>>>>,
}

impl RuleRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule at the end of its bucket
    ///
    /// Disabled rules are never stored. Re-adding a field-identical rule
    /// is a no-op; returns whether the rule was actually inserted.
    pub fn add(&self, rule: Rule) -> bool {
        if !rule.enabled {
            debug!("ignoring disabled rule");
            return false;
        }
        let key = BucketKey::of(&rule);
        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(key).or_default();
        if bucket.iter().any(|existing| **existing == rule) {
            debug!(
                source = %rule.source,
                dest = %rule.dest,
                mtype = %rule.mtype,
                "identical rule already present"
            );
            return false;
        }
        info!(
            source = %rule.source,
            dest = %rule.dest,
            mtype = %rule.mtype,
            "rule added"
        );
        bucket.push(Arc::new(rule));
        true
    }

    /// Remove every rule the predicate matches; returns the count removed
    pub fn remove_matching(&self, predicate: impl Fn(&Rule) -> bool) -> usize {
        let mut buckets = self.buckets.write();
        let mut removed = 0;
        buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|rule| !predicate(rule));
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        if removed > 0 {
            info!(removed, "rules removed");
        }
        removed
    }

    /// Snapshot of the bucket for a triple, in insertion order
    ///
    /// The returned handles stay valid regardless of concurrent writes.
    #[must_use]
    pub fn lookup(
        &self,
        source: &ServiceName,
        dest: &ServiceName,
        mtype: MessageType,
    ) -> Vec<Arc<Rule>> {
        let key = BucketKey {
            source: source.clone(),
            dest: dest.clone(),
            mtype,
        };
        self.buckets.read().get(&key).cloned().unwrap_or_default()
    }

    /// Point-in-time copy of every rule, for introspection
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Rule>> {
        self.buckets
            .read()
            .values()
            .flat_map(|bucket| bucket.iter().cloned())
            .collect()
    }

    /// Drop every rule; returns the count removed
    pub fn reset(&self) -> usize {
        let mut buckets = self.buckets.write();
        let removed = buckets.values().map(Vec::len).sum();
        buckets.clear();
        if removed > 0 {
            info!(removed, "registry reset");
        }
        removed
    }

    /// Total number of stored rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.read().values().map(Vec::len).sum()
    }

    /// Whether the registry holds no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.read().values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use domain::RuleConfig;

    use super::*;

    fn rule(source: &str, dest: &str, body_pattern: &str) -> Rule {
        Rule::from_config(&RuleConfig {
            source: source.to_string(),
            dest: dest.to_string(),
            mtype: "request".to_string(),
            header_pattern: ".*".to_string(),
            body_pattern: body_pattern.to_string(),
            abort_probability: 1.0,
            error_code: 503,
            ..RuleConfig::default()
        })
        .unwrap()
    }

    fn key(source: &str) -> ServiceName {
        ServiceName::new(source).unwrap()
    }

    #[test]
    fn add_then_lookup_returns_the_rule() {
        let registry = RuleRegistry::new();
        assert!(registry.add(rule("a", "b", "")));
        let found = registry.lookup(&key("a"), &key("b"), MessageType::Request);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].error_code, 503);
    }

    #[test]
    fn lookup_misses_other_triples() {
        let registry = RuleRegistry::new();
        registry.add(rule("a", "b", ""));
        assert!(
            registry
                .lookup(&key("a"), &key("c"), MessageType::Request)
                .is_empty()
        );
        assert!(
            registry
                .lookup(&key("a"), &key("b"), MessageType::Response)
                .is_empty()
        );
    }

    #[test]
    fn identical_rule_is_a_no_op() {
        let registry = RuleRegistry::new();
        assert!(registry.add(rule("a", "b", "x")));
        assert!(!registry.add(rule("a", "b", "x")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn differing_rules_share_a_bucket_in_insertion_order() {
        let registry = RuleRegistry::new();
        registry.add(rule("a", "b", "first"));
        registry.add(rule("a", "b", "second"));
        let found = registry.lookup(&key("a"), &key("b"), MessageType::Request);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].body_pattern.as_str(), "first");
        assert_eq!(found[1].body_pattern.as_str(), "second");
    }

    #[test]
    fn disabled_rules_are_never_stored() {
        let registry = RuleRegistry::new();
        assert!(!registry.add(Rule::nop()));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_matching_reports_count() {
        let registry = RuleRegistry::new();
        registry.add(rule("a", "b", "x"));
        registry.add(rule("a", "b", "y"));
        registry.add(rule("a", "c", "x"));
        let removed = registry.remove_matching(|r| r.body_pattern.as_str() == "x");
        assert_eq!(removed, 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_matching_nothing_is_zero() {
        let registry = RuleRegistry::new();
        registry.add(rule("a", "b", "x"));
        assert_eq!(registry.remove_matching(|_| false), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let registry = RuleRegistry::new();
        registry.add(rule("a", "b", "x"));
        registry.add(rule("c", "d", "y"));
        assert_eq!(registry.reset(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.reset(), 0);
    }

    #[test]
    fn snapshot_copies_all_rules() {
        let registry = RuleRegistry::new();
        registry.add(rule("a", "b", "x"));
        registry.add(rule("c", "d", "y"));
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn snapshots_stay_consistent_under_concurrent_writes() {
        let registry = Arc::new(RuleRegistry::new());

        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..200 {
                    registry.add(rule("a", "b", &format!("pattern-{i}")));
                    if i % 3 == 0 {
                        registry.remove_matching(|r| {
                            r.body_pattern.as_str() == format!("pattern-{i}")
                        });
                    }
                }
            })
        };

        // Every snapshot observed mid-write must hold fully constructed,
        // enabled rules
        for _ in 0..200 {
            for snapshot_rule in registry.snapshot() {
                assert!(snapshot_rule.enabled);
                assert!(snapshot_rule.body_pattern.as_str().starts_with("pattern-"));
            }
        }

        writer.join().unwrap();
    }

    #[test]
    fn lookup_snapshot_survives_later_removal() {
        let registry = RuleRegistry::new();
        registry.add(rule("a", "b", "x"));
        let held = registry.lookup(&key("a"), &key("b"), MessageType::Request);
        registry.reset();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].body_pattern.as_str(), "x");
    }
}
