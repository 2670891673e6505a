//! Resolver handle and configuration.

use crate::definition::{MissingPolicy, RelationDefinition};
use crate::n1_detection::{N1QueryTracker, N1Stats};
use crate::registry::RelationRegistry;
use scalar_relations_core::Model;

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// What to cache when an entity's group produced no row
    pub missing: MissingPolicy,
    /// Skip entities that already cache the relation
    pub skip_cached: bool,
    /// Single-entity queries per relation before warning; `None` disables tracking
    pub n1_threshold: Option<usize>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            missing: MissingPolicy::default(),
            skip_cached: true,
            n1_threshold: Some(3),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the missing-row policy.
    pub fn missing(mut self, policy: MissingPolicy) -> Self {
        self.missing = policy;
        self
    }

    /// Re-resolve relations that are already cached when `false`.
    pub fn skip_cached(mut self, enabled: bool) -> Self {
        self.skip_cached = enabled;
        self
    }

    /// Set the N+1 warning threshold.
    pub fn n1_threshold(mut self, threshold: Option<usize>) -> Self {
        self.n1_threshold = threshold;
        self
    }
}

/// Resolves scalar relations registered in a [`RelationRegistry`].
///
/// [`resolve_batch`](Self::resolve_batch) runs one grouped query per
/// relation for a whole slice of entities;
/// [`resolve_one`](Self::resolve_one) runs one query for one entity.
/// Both write into each entity's [`ScalarCache`](crate::ScalarCache).
#[derive(Debug)]
pub struct ScalarResolver<'r> {
    pub(crate) registry: &'r RelationRegistry,
    pub(crate) config: ResolverConfig,
    pub(crate) n1: Option<N1QueryTracker>,
}

impl<'r> ScalarResolver<'r> {
    /// Create a resolver with the default configuration.
    pub fn new(registry: &'r RelationRegistry) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    pub fn with_config(registry: &'r RelationRegistry, config: ResolverConfig) -> Self {
        let n1 = config
            .n1_threshold
            .map(|threshold| N1QueryTracker::new().with_threshold(threshold));
        Self {
            registry,
            config,
            n1,
        }
    }

    pub fn registry(&self) -> &'r RelationRegistry {
        self.registry
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn n1_tracker(&self) -> Option<&N1QueryTracker> {
        self.n1.as_ref()
    }

    /// Current N+1 counters, if tracking is enabled.
    pub fn n1_stats(&self) -> Option<N1Stats> {
        self.n1.as_ref().map(N1QueryTracker::stats)
    }

    /// Forget N+1 counters.
    pub fn reset_n1_tracking(&mut self) {
        if let Some(tracker) = self.n1.as_mut() {
            tracker.reset();
        }
    }

    /// The policy for a relation: its own override, else the resolver's.
    pub(crate) fn missing_policy<'a, M: Model>(
        &'a self,
        definition: &'a RelationDefinition<M>,
    ) -> &'a MissingPolicy {
        definition.missing().unwrap_or(&self.config.missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalar_relations_core::Value;

    #[test]
    fn default_config_fills_zero_and_skips_cached() {
        let config = ResolverConfig::default();
        assert_eq!(config.missing, MissingPolicy::Fill(Value::BigInt(0)));
        assert!(config.skip_cached);
        assert_eq!(config.n1_threshold, Some(3));
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = ResolverConfig::new()
            .missing(MissingPolicy::LeaveUnresolved)
            .skip_cached(false)
            .n1_threshold(None);
        assert_eq!(config.missing, MissingPolicy::LeaveUnresolved);
        assert!(!config.skip_cached);
        assert!(config.n1_threshold.is_none());
    }

    #[test]
    fn n1_tracking_follows_threshold() {
        let registry = RelationRegistry::new();
        let resolver = ScalarResolver::new(&registry);
        assert_eq!(resolver.n1_tracker().map(N1QueryTracker::threshold), Some(3));
        assert_eq!(resolver.n1_stats(), Some(N1Stats::default()));

        let quiet =
            ScalarResolver::with_config(&registry, ResolverConfig::new().n1_threshold(None));
        assert!(quiet.n1_tracker().is_none());
        assert!(quiet.n1_stats().is_none());
    }
}
