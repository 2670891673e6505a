//! Model trait for entity persistence mapping.
//!
//! A `Model` is one homogeneous record type: it knows its table, its primary
//! key columns and how to move between itself and a row of values. The
//! resolver only reads entities through this trait.

use crate::Result;
use crate::row::Row;
use crate::value::Value;

/// Trait for types that can be mapped to database tables.
///
/// # Example
///
/// ```ignore
/// struct User {
///     id: i64,
///     branch_id: i64,
/// }
///
/// impl Model for User {
///     const TABLE_NAME: &'static str = "users";
///     const PRIMARY_KEY: &'static [&'static str] = &["id"];
///
///     fn to_row(&self) -> Vec<(&'static str, Value)> {
///         vec![("id", self.id.into()), ("branch_id", self.branch_id.into())]
///     }
///
///     fn from_row(row: &Row) -> Result<Self> {
///         Ok(Self { id: row.get_named("id")?, branch_id: row.get_named("branch_id")? })
///     }
/// }
/// ```
pub trait Model: Sized + Send + Sync {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// The primary key column name(s), in key order.
    const PRIMARY_KEY: &'static [&'static str];

    /// Convert this model instance to a row of values.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Construct a model instance from a database row.
    #[allow(clippy::result_large_err)]
    fn from_row(row: &Row) -> Result<Self>;

    /// Read one attribute by its bare (unqualified) column name.
    ///
    /// Returns `None` when the model has no such attribute; a NULL column is
    /// `Some(Value::Null)`. Override this when `to_row` is expensive.
    fn attribute(&self, name: &str) -> Option<Value> {
        self.to_row()
            .into_iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| value)
    }

    /// Get the value of the primary key field(s), in `PRIMARY_KEY` order.
    fn primary_key_value(&self) -> Vec<Value> {
        Self::PRIMARY_KEY
            .iter()
            .map(|column| self.attribute(column).unwrap_or(Value::Null))
            .collect()
    }

    /// A human-readable name for diagnostics.
    fn entity_name() -> &'static str {
        Self::TABLE_NAME
    }
}
