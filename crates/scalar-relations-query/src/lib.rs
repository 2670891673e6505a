//! SQL query builder for batched scalar relations.
//!
//! `scalar-relations-query` is the **query construction layer**. Relation
//! factories return a [`Select`] describing one aggregate over a model's
//! table; the resolver rewrites its select and GROUP BY lists and adds an
//! `IN` filter before rendering it. Entity queries can name the scalar
//! relations to resolve once their models are loaded
//! ([`Select::with_scalar`]).
//!
//! - **Expression DSL**: `Expr` and operators build WHERE/HAVING/ON clauses.
//! - **Dialect support**: placeholders and quoting follow the connection's
//!   `Dialect`.
//!
//! The resulting queries execute through the `Connection` trait from
//! `scalar-relations-core`.

pub mod clause;
pub mod expr;
pub mod join;
pub mod select;

pub use clause::Where;
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use join::{Join, JoinType};
pub use scalar_relations_core::Dialect;
pub use select::Select;
