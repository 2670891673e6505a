//! JOIN clause types.

use crate::expr::Expr;
use scalar_relations_core::{Dialect, Value};

/// A JOIN clause.
#[derive(Debug, Clone)]
pub struct Join {
    /// Type of join
    pub join_type: JoinType,
    /// Table to join
    pub table: String,
    /// Optional table alias
    pub alias: Option<String>,
    /// ON condition
    pub on: Expr,
}

/// Types of SQL joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    /// Get the SQL keyword for this join type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

impl Join {
    fn new(join_type: JoinType, table: impl Into<String>, on: Expr) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: None,
            on,
        }
    }

    /// Create an INNER JOIN.
    pub fn inner(table: impl Into<String>, on: Expr) -> Self {
        Self::new(JoinType::Inner, table, on)
    }

    /// Create a LEFT JOIN.
    pub fn left(table: impl Into<String>, on: Expr) -> Self {
        Self::new(JoinType::Left, table, on)
    }

    /// Create a RIGHT JOIN.
    pub fn right(table: impl Into<String>, on: Expr) -> Self {
        Self::new(JoinType::Right, table, on)
    }

    /// Set an alias for the joined table.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Generate SQL for this JOIN clause and collect parameters.
    ///
    /// The leading space is included so joins can be appended directly.
    pub fn build_with_dialect(
        &self,
        dialect: Dialect,
        params: &mut Vec<Value>,
        offset: usize,
    ) -> String {
        let mut sql = format!(" {} {}", self.join_type.as_str(), self.table);
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }
        let on_sql = self.on.build_with_dialect(dialect, params, offset);
        sql.push_str(" ON ");
        sql.push_str(&on_sql);
        sql
    }
}
