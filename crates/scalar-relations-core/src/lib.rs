//! Core types and traits for batched scalar relations.
//!
//! This crate provides the foundational abstractions the resolver is built on:
//!
//! - `Model` trait describing an entity's persistence mapping
//! - `Value` and `Row` for dynamically-typed query results
//! - `Connection` trait for executing queries
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod error;
pub mod model;
pub mod row;
pub mod value;

pub use connection::{Connection, Dialect};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, NotFoundError, QueryError,
    QueryErrorKind, Result, TypeError, TypeMismatchError,
};
pub use model::Model;
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
