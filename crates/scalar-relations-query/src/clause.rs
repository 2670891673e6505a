//! SQL clause types.

use crate::expr::Expr;
use scalar_relations_core::{Dialect, Value};

/// WHERE clause.
///
/// Conditions accumulate with AND; an OR group added earlier keeps its own
/// parentheses when later conditions are ANDed onto it.
#[derive(Debug, Clone)]
pub struct Where {
    expr: Expr,
}

impl Where {
    /// Create a new WHERE clause with the given expression.
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    /// Add an AND condition.
    pub fn and(self, expr: Expr) -> Self {
        Self {
            expr: self.expr.and(expr),
        }
    }

    /// Add an OR condition.
    pub fn or(self, expr: Expr) -> Self {
        Self {
            expr: self.expr.or(expr),
        }
    }

    /// The accumulated condition.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Build the WHERE clause SQL and parameters.
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_offset(Dialect::default(), 0)
    }

    /// Build the WHERE clause with a parameter offset.
    pub fn build_with_offset(&self, dialect: Dialect, offset: usize) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.expr.build_with_dialect(dialect, &mut params, offset);
        (sql, params)
    }
}
