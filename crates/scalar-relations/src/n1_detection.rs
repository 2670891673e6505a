//! N+1 detection for the single-entity path.
//!
//! Resolving a relation entity by entity costs one query each. The tracker
//! counts single-entity resolutions per (entity type, relation) and warns
//! once a pair reaches the threshold, pointing at the batch resolver.
//!
//! # Example
//!
//! ```ignore
//! // Warns on the third iteration:
//! for user in &mut users {
//!     resolver.resolve_one(&cx, &conn, user, "active_orders").await;
//! }
//!
//! // One query for the whole slice:
//! resolver.resolve_batch(&cx, &conn, &mut users, &["active_orders"]).await;
//! ```

use std::collections::HashMap;
use std::panic::Location;

/// Call sites kept per (entity type, relation); later loads are only counted.
const SITES_PER_RELATION: usize = 5;

/// Where a single-entity resolution was requested from.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub entity: &'static str,
    pub relation: String,
    pub file: &'static str,
    pub line: u32,
}

/// Snapshot of tracker counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct N1Stats {
    /// Single-entity queries recorded
    pub total_loads: usize,
    /// Distinct (entity type, relation) pairs seen
    pub relations_loaded: usize,
    /// Pairs at or above the threshold
    pub potential_n1: usize,
}

/// Counts single-entity relation queries.
#[derive(Debug)]
pub struct N1QueryTracker {
    counts: HashMap<(&'static str, String), usize>,
    threshold: usize,
    enabled: bool,
    call_sites: Vec<CallSite>,
}

impl Default for N1QueryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl N1QueryTracker {
    /// Create a tracker with the default threshold (3).
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            threshold: 3,
            enabled: true,
            call_sites: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Record a single-entity query issued from the caller's location.
    #[track_caller]
    pub fn record_load(&mut self, entity: &'static str, relation: &str) {
        self.record_load_at(entity, relation, Location::caller());
    }

    /// Record a single-entity query issued from `site`.
    ///
    /// Warns exactly once per pair, when its count reaches the threshold.
    /// Only the first few call sites of a pair are kept.
    pub fn record_load_at(
        &mut self,
        entity: &'static str,
        relation: &str,
        site: &'static Location<'static>,
    ) {
        if !self.enabled {
            return;
        }

        let count = self
            .counts
            .entry((entity, relation.to_string()))
            .or_insert(0);
        *count += 1;
        let count = *count;

        if count <= SITES_PER_RELATION {
            self.call_sites.push(CallSite {
                entity,
                relation: relation.to_string(),
                file: site.file(),
                line: site.line(),
            });
        }

        if count == self.threshold {
            self.emit_warning(entity, relation, count);
        }
    }

    fn emit_warning(&self, entity: &'static str, relation: &str, count: usize) {
        tracing::warn!(
            target: "scalar_relations::n1",
            entity = entity,
            relation = relation,
            queries = count,
            threshold = self.threshold,
            "N+1 query pattern detected; resolve this relation with ScalarResolver::resolve_batch"
        );

        for (i, site) in self
            .call_sites
            .iter()
            .filter(|s| s.entity == entity && s.relation == relation)
            .enumerate()
        {
            tracing::debug!(
                target: "scalar_relations::n1",
                index = i,
                file = site.file,
                line = site.line,
                "  [{}] {}:{}",
                i,
                site.file,
                site.line
            );
        }
    }

    /// Forget all counts, e.g. at the start of a new request.
    pub fn reset(&mut self) {
        self.counts.clear();
        self.call_sites.clear();
    }

    #[must_use]
    pub fn count_for(&self, entity: &'static str, relation: &str) -> usize {
        self.counts
            .get(&(entity, relation.to_string()))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn stats(&self) -> N1Stats {
        N1Stats {
            total_loads: self.counts.values().sum(),
            relations_loaded: self.counts.len(),
            potential_n1: self
                .counts
                .values()
                .filter(|&&c| c >= self.threshold)
                .count(),
        }
    }

    #[must_use]
    pub fn call_sites(&self) -> &[CallSite] {
        &self.call_sites
    }
}
