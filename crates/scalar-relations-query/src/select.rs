//! SELECT query builder.

use crate::clause::Where;
use crate::expr::Expr;
use crate::join::Join;
use asupersync::{Cx, Outcome};
use scalar_relations_core::{Connection, Dialect, Error, Model, Row, Value};
use std::marker::PhantomData;

/// A SELECT query builder over one model's table.
///
/// Select-list and GROUP BY entries are SQL fragments (`"COUNT(*)"`,
/// `"users.branch_id"`); conditions are [`Expr`]s with bound parameters.
#[derive(Debug, Clone)]
pub struct Select<M: Model> {
    /// Columns to select (empty = all)
    columns: Vec<String>,
    /// WHERE clause conditions
    where_clause: Option<Where>,
    /// JOIN clauses
    joins: Vec<Join>,
    /// GROUP BY columns
    group_by: Vec<String>,
    /// HAVING clause
    having: Option<Where>,
    /// LIMIT clause
    limit: Option<u64>,
    /// DISTINCT flag
    distinct: bool,
    /// Scalar relations to resolve on the loaded models
    scalar: Vec<String>,
    /// Model type marker
    _marker: PhantomData<M>,
}

impl<M: Model> Select<M> {
    /// Create a new SELECT query for the model's table.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            where_clause: None,
            joins: Vec::new(),
            group_by: Vec::new(),
            having: None,
            limit: None,
            distinct: false,
            scalar: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Select specific columns or expressions.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|&s| s.to_string()).collect();
        self
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(expr),
            None => Where::new(expr),
        });
        self
    }

    /// Add an OR WHERE condition.
    pub fn or_filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.or(expr),
            None => Where::new(expr),
        });
        self
    }

    /// Add a JOIN clause.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add GROUP BY columns.
    pub fn group_by(mut self, cols: &[&str]) -> Self {
        self.group_by.extend(cols.iter().map(|&s| s.to_string()));
        self
    }

    /// Add HAVING condition.
    pub fn having(mut self, expr: Expr) -> Self {
        self.having = Some(match self.having {
            Some(existing) => existing.and(expr),
            None => Where::new(expr),
        });
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Make this a DISTINCT query.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Request scalar relations for the models this query loads.
    ///
    /// The query itself is unchanged; a scalar resolver reads the names and
    /// resolves them in one batch once the models are loaded. Repeated names
    /// are kept once.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let users = resolver
    ///     .load_all(&cx, &conn, Select::<User>::new().with_scalar(&["active_orders"]))
    ///     .await;
    /// ```
    pub fn with_scalar(mut self, relations: &[&str]) -> Self {
        for &relation in relations {
            if !self.scalar.iter().any(|r| r == relation) {
                self.scalar.push(relation.to_string());
            }
        }
        self
    }

    /// Scalar relations requested with [`with_scalar`](Self::with_scalar).
    pub fn scalar_relations(&self) -> &[String] {
        &self.scalar
    }

    /// The current select list, in order.
    pub fn selected_columns(&self) -> &[String] {
        &self.columns
    }

    /// The current GROUP BY list, in order.
    pub fn group_by_columns(&self) -> &[String] {
        &self.group_by
    }

    /// Replace the select list.
    pub fn set_columns(&mut self, cols: Vec<String>) {
        self.columns = cols;
    }

    /// Replace the GROUP BY list.
    pub fn set_group_by(&mut self, cols: Vec<String>) {
        self.group_by = cols;
    }

    /// Build the SQL query and parameters (PostgreSQL dialect).
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the SQL query and parameters for a specific dialect.
    #[tracing::instrument(level = "trace", skip(self), fields(table = M::TABLE_NAME))]
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();

        // SELECT
        sql.push_str("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }

        // FROM
        sql.push_str(" FROM ");
        sql.push_str(M::TABLE_NAME);

        // JOINs
        for join in &self.joins {
            sql.push_str(&join.build_with_dialect(dialect, &mut params, 0));
        }

        // WHERE
        if let Some(where_clause) = &self.where_clause {
            let (where_sql, where_params) = where_clause.build_with_offset(dialect, params.len());
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params.extend(where_params);
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        // HAVING
        if let Some(having) = &self.having {
            let (having_sql, having_params) = having.build_with_offset(dialect, params.len());
            sql.push_str(" HAVING ");
            sql.push_str(&having_sql);
            params.extend(having_params);
        }

        // LIMIT
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        (sql, params)
    }

    /// Execute the query and return all matching rows as models.
    pub async fn all<C: Connection>(self, cx: &Cx, conn: &C) -> Outcome<Vec<M>, Error> {
        let rows = self.rows(cx, conn).await;

        rows.and_then(|rows| {
            let mut models = Vec::with_capacity(rows.len());
            for row in &rows {
                match M::from_row(row) {
                    Ok(model) => models.push(model),
                    Err(e) => return Outcome::Err(e),
                }
            }
            Outcome::Ok(models)
        })
    }

    /// Execute the query and return the raw rows without materializing models.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(table = M::TABLE_NAME))]
    pub async fn rows<C: Connection>(self, cx: &Cx, conn: &C) -> Outcome<Vec<Row>, Error> {
        let (sql, params) = self.build_with_dialect(conn.dialect());
        tracing::trace!(sql = %sql, params = params.len(), "Executing select");
        conn.query(cx, &sql, &params).await
    }

    /// Execute the query and return the first column of the first row.
    ///
    /// `None` means the query produced no row; a NULL column is
    /// `Some(Value::Null)`.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(table = M::TABLE_NAME))]
    pub async fn scalar<C: Connection>(self, cx: &Cx, conn: &C) -> Outcome<Option<Value>, Error> {
        let (sql, params) = self.build_with_dialect(conn.dialect());
        tracing::trace!(sql = %sql, params = params.len(), "Executing scalar select");
        let row = conn.query_one(cx, &sql, &params).await;

        row.and_then(|opt_row| match opt_row {
            Some(row) => match row.get(0) {
                Some(value) => Outcome::Ok(Some(value.clone())),
                None => Outcome::Err(Error::Type(scalar_relations_core::TypeError {
                    expected: "one column",
                    actual: "row without columns".to_string(),
                    column: None,
                })),
            },
            None => Outcome::Ok(None),
        })
    }
}

impl<M: Model> Default for Select<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalar_relations_core::Result;

    #[derive(Debug, Clone)]
    struct User;

    impl Model for User {
        const TABLE_NAME: &'static str = "users";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            Vec::new()
        }

        fn from_row(_row: &Row) -> Result<Self> {
            Ok(User)
        }
    }

    #[test]
    fn test_select_all_columns() {
        let (sql, params) = Select::<User>::new().build();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_specific_columns() {
        let (sql, _) = Select::<User>::new().columns(&["id", "name"]).build();
        assert_eq!(sql, "SELECT id, name FROM users");
    }

    #[test]
    fn test_select_distinct_with_limit() {
        let (sql, _) = Select::<User>::new()
            .columns(&["branch_id"])
            .distinct()
            .limit(5)
            .build();
        assert_eq!(sql, "SELECT DISTINCT branch_id FROM users LIMIT 5");
    }

    #[test]
    fn build_collects_params_across_joins_where_having() {
        let query = Select::<User>::new()
            .columns(&["users.branch_id", "COUNT(*)"])
            .join(Join::inner(
                "orders",
                Expr::qualified("orders", "archived").eq(false),
            ))
            .filter(Expr::qualified("orders", "status").eq("active"))
            .group_by(&["users.branch_id"])
            .having(Expr::raw("COUNT(*)").gt(1));

        let (sql, params) = query.build();

        assert_eq!(
            sql,
            "SELECT users.branch_id, COUNT(*) FROM users INNER JOIN orders ON \"orders\".\"archived\" = $1 WHERE \"orders\".\"status\" = $2 GROUP BY users.branch_id HAVING COUNT(*) > $3"
        );
        assert_eq!(
            params,
            vec![
                Value::Bool(false),
                Value::Text("active".to_string()),
                Value::Int(1)
            ]
        );
    }

    #[test]
    fn test_or_filter_then_filter_keeps_grouping() {
        let (sql, _) = Select::<User>::new()
            .filter(Expr::col("role").eq("admin"))
            .or_filter(Expr::col("role").eq("owner"))
            .filter(Expr::col("branch_id").in_list(vec![1, 2]))
            .build();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE (\"role\" = $1 OR \"role\" = $2) AND \"branch_id\" IN ($3, $4)"
        );
    }

    #[test]
    fn test_accessors_and_setters() {
        let mut query = Select::<User>::new()
            .columns(&["COUNT(*)"])
            .group_by(&["status"]);
        assert_eq!(query.selected_columns(), ["COUNT(*)"]);
        assert_eq!(query.group_by_columns(), ["status"]);

        query.set_columns(vec!["users.id".into(), "COUNT(*) AS n".into()]);
        query.set_group_by(vec!["status".into(), "users.id".into()]);
        let (sql, _) = query.build();
        assert_eq!(
            sql,
            "SELECT users.id, COUNT(*) AS n FROM users GROUP BY status, users.id"
        );
    }

    #[test]
    fn test_with_scalar_keeps_sql_and_dedups_names() {
        let query = Select::<User>::new()
            .filter(Expr::col("active").eq(true))
            .with_scalar(&["active_orders", "order_total"])
            .with_scalar(&["active_orders"]);
        assert_eq!(query.scalar_relations(), ["active_orders", "order_total"]);
        assert_eq!(query.build().0, "SELECT * FROM users WHERE \"active\" = $1");
    }

    #[test]
    fn test_sqlite_dialect_placeholders() {
        let (sql, _) = Select::<User>::new()
            .filter(Expr::qualified("users", "id").eq(7_i64))
            .build_with_dialect(Dialect::Sqlite);
        assert_eq!(sql, "SELECT * FROM users WHERE \"users\".\"id\" = ?1");
    }
}
