//! Per-entity memoization of resolved relation values.

use scalar_relations_core::{FromValue, Model, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resolved scalar relation values for one entity, keyed by relation name.
///
/// A cache holds at most one value per relation defined on the entity's
/// type. There is no eviction; the cache lives and dies with its entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalarCache {
    values: HashMap<String, Value>,
}

impl ScalarCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the resolved value for a relation, if any.
    pub fn get(&self, relation: &str) -> Option<&Value> {
        self.values.get(relation)
    }

    /// Store a resolved value, replacing any previous one.
    pub fn set(&mut self, relation: impl Into<String>, value: Value) {
        self.values.insert(relation.into(), value);
    }

    /// Whether a relation has been resolved.
    pub fn contains(&self, relation: &str) -> bool {
        self.values.contains_key(relation)
    }

    /// Forget a resolved value so the next access resolves it again.
    pub fn remove(&mut self, relation: &str) -> Option<Value> {
        self.values.remove(relation)
    }

    /// Forget every resolved value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of the resolved relations, in no particular order.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// An entity that owns a [`ScalarCache`].
///
/// The resolvers only go through `get_cached`/`set_cached`; they never touch
/// the entity's other state.
///
/// # Example
///
/// ```ignore
/// struct User {
///     id: i64,
///     branch_id: i64,
///     scalars: ScalarCache,
/// }
///
/// impl ScalarModel for User {
///     fn scalar_cache(&self) -> &ScalarCache { &self.scalars }
///     fn scalar_cache_mut(&mut self) -> &mut ScalarCache { &mut self.scalars }
/// }
///
/// let orders: Option<Result<i64>> = user.cached_as("active_orders");
/// ```
pub trait ScalarModel: Model {
    fn scalar_cache(&self) -> &ScalarCache;

    fn scalar_cache_mut(&mut self) -> &mut ScalarCache;

    /// The cached value of a relation, or `None` if it was never resolved.
    fn get_cached(&self, relation: &str) -> Option<&Value> {
        self.scalar_cache().get(relation)
    }

    /// Record the value of a relation.
    fn set_cached(&mut self, relation: &str, value: Value) {
        self.scalar_cache_mut().set(relation, value);
    }

    /// The cached value converted to `T`.
    ///
    /// `None` when unresolved; `Some(Err(_))` when the value does not convert.
    #[allow(clippy::result_large_err)]
    fn cached_as<T: FromValue>(&self, relation: &str) -> Option<Result<T>> {
        self.get_cached(relation).map(T::from_value)
    }
}
