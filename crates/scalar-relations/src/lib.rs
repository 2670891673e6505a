//! Batched scalar relations.
//!
//! A *scalar relation* is a named aggregate attached to an entity, such as the
//! number of active orders of a user's branch. Computing it entity by entity
//! costs one query each. This crate computes it for a whole slice of
//! entities with one grouped query per relation, then distributes the
//! values by group key into each entity's [`ScalarCache`].
//!
//! # Role In The Architecture
//!
//! - **Registry**: [`RelationRegistry`] maps (entity type, relation name) to
//!   a [`RelationDefinition`]: group attributes plus a factory for a
//!   single-expression aggregate [`Select`].
//! - **Batch path**: [`ScalarResolver::resolve_batch`] plans every relation,
//!   then runs `SELECT <group attrs>, <aggregate> AS <name> ... WHERE <attr>
//!   IN (<batch keys>) GROUP BY <group attrs>` once per relation.
//! - **Query-level loading**: [`ScalarResolver::load_all`] runs an entity
//!   query built with [`Select::with_scalar`] and batch-resolves the named
//!   relations on the loaded models.
//! - **Single path**: [`ScalarResolver::resolve_one`] filters the aggregate by
//!   one entity's primary key; repeated use is tracked for N+1 warnings.
//!
//! Queries run through the `Connection` trait from `scalar-relations-core`,
//! with asupersync's `Cx` and `Outcome`.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = RelationRegistry::new();
//! registry.define::<User>("active_orders", Some(&["branch_id"]), || {
//!     Select::new()
//!         .columns(&["COUNT(*)"])
//!         .join(Join::inner("orders", Expr::raw("orders.user_id = users.id")))
//!         .filter(Expr::qualified("orders", "status").eq("active"))
//! })?;
//!
//! let resolver = ScalarResolver::new(&registry);
//! resolver.resolve_batch(&cx, &conn, &mut users, &["active_orders"]).await;
//! let orders: Option<Result<i64>> = users[0].cached_as("active_orders");
//! ```

pub mod batch;
pub mod cache;
pub mod definition;
pub mod eager;
pub mod group_key;
pub mod n1_detection;
pub mod registry;
pub mod resolver;
pub mod single;

pub use cache::{ScalarCache, ScalarModel};
pub use definition::{AggregateQuery, GroupAttribute, MissingPolicy, QueryFactory, RelationDefinition};
pub use group_key::{GroupKey, KeyPart};
pub use n1_detection::{CallSite, N1QueryTracker, N1Stats};
pub use registry::RelationRegistry;
pub use resolver::{ResolverConfig, ScalarResolver};

pub use scalar_relations_core::{
    Connection, Cx, Dialect, Error, FromValue, Model, Outcome, Result, Row, Value,
};
pub use scalar_relations_query::{Expr, Join, JoinType, Select, Where};

/// Commonly used types for defining and resolving scalar relations.
pub mod prelude {
    pub use crate::{
        Connection, Cx, Error, Expr, Join, JoinType, MissingPolicy, Model, Outcome,
        RelationRegistry, ResolverConfig, Result, Row, ScalarCache, ScalarModel, ScalarResolver,
        Select, Value,
    };
}
