//! Shared fixtures: a recording mock connection and a `User` entity.

#![allow(dead_code, clippy::manual_async_fn)]

use asupersync::runtime::RuntimeBuilder;
use scalar_relations::prelude::*;
use scalar_relations::Dialect;
use scalar_relations_core::error::{QueryError, QueryErrorKind};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct MockState {
    pub query_calls: usize,
    pub query_one_calls: usize,
    pub executed: Vec<(String, Vec<Value>)>,
    /// Canned rows, served for the first needle found in the SQL
    pub responses: Vec<(String, Vec<Row>)>,
    /// Fail any query whose SQL contains this needle
    pub fail_when: Option<String>,
}

impl MockState {
    fn serve(&mut self, sql: &str, params: &[Value]) -> Outcome<Vec<Row>, Error> {
        self.executed.push((sql.to_string(), params.to_vec()));

        if let Some(needle) = &self.fail_when {
            if sql.contains(needle.as_str()) {
                return Outcome::Err(Error::Query(QueryError {
                    kind: QueryErrorKind::Database,
                    sql: Some(sql.to_string()),
                    sqlstate: Some("42P01".to_string()),
                    message: "relation does not exist".to_string(),
                    source: None,
                }));
            }
        }

        let rows = self
            .responses
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();
        Outcome::Ok(rows)
    }
}

#[derive(Debug, Clone)]
pub struct MockConnection {
    pub state: Arc<Mutex<MockState>>,
    pub dialect: Dialect,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            dialect: Dialect::Postgres,
        }
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::new()
        }
    }

    pub fn respond(&self, needle: &str, rows: Vec<Row>) {
        self.state
            .lock()
            .expect("lock poisoned")
            .responses
            .push((needle.to_string(), rows));
    }

    pub fn fail_when(&self, needle: &str) {
        self.state.lock().expect("lock poisoned").fail_when = Some(needle.to_string());
    }

    /// Total queries executed through either method.
    pub fn calls(&self) -> usize {
        let guard = self.state.lock().expect("lock poisoned");
        guard.query_calls + guard.query_one_calls
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().expect("lock poisoned").executed.clone()
    }
}

impl Connection for MockConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let state = Arc::clone(&self.state);
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            let mut guard = state.lock().expect("lock poisoned");
            guard.query_calls += 1;
            guard.serve(&sql, &params)
        }
    }

    fn query_one(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let state = Arc::clone(&self.state);
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            let mut guard = state.lock().expect("lock poisoned");
            guard.query_one_calls += 1;
            guard.serve(&sql, &params).map(|rows| rows.into_iter().next())
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub branch_id: Option<i64>,
    pub region: String,
    pub scalars: ScalarCache,
}

impl User {
    pub fn new(id: i64, branch_id: Option<i64>, region: &str) -> Self {
        Self {
            id,
            branch_id,
            region: region.to_string(),
            scalars: ScalarCache::new(),
        }
    }
}

impl Model for User {
    const TABLE_NAME: &'static str = "users";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::BigInt(self.id)),
            ("branch_id", self.branch_id.into()),
            ("region", Value::Text(self.region.clone())),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            branch_id: row.get_named("branch_id")?,
            region: row.get_named("region")?,
            scalars: ScalarCache::new(),
        })
    }
}

impl ScalarModel for User {
    fn scalar_cache(&self) -> &ScalarCache {
        &self.scalars
    }

    fn scalar_cache_mut(&mut self) -> &mut ScalarCache {
        &mut self.scalars
    }
}

fn orders_join() -> Join {
    Join::inner("orders", Expr::raw("orders.user_id = users.id"))
}

/// `active_orders` by branch, `regional_total` by (branch, region) and
/// `order_total` by primary key.
pub fn registry() -> RelationRegistry {
    let mut registry = RelationRegistry::new();
    registry
        .define::<User>("active_orders", Some(&["branch_id"][..]), || {
            Select::new()
                .columns(&["COUNT(*)"])
                .join(orders_join())
                .filter(Expr::qualified("orders", "status").eq("active"))
        })
        .expect("define active_orders");
    registry
        .define::<User>("regional_total", Some(&["branch_id", "region"][..]), || {
            Select::new()
                .columns(&["SUM(orders.total)"])
                .join(orders_join())
        })
        .expect("define regional_total");
    registry
        .define::<User>("order_total", None, || {
            Select::new()
                .columns(&["SUM(orders.total)"])
                .join(orders_join())
        })
        .expect("define order_total");
    registry
}

pub fn branch_row(branch: i64, relation: &str, value: Value) -> Row {
    Row::new(
        vec!["branch_id".to_string(), relation.to_string()],
        vec![Value::BigInt(branch), value],
    )
}

pub fn users() -> Vec<User> {
    vec![
        User::new(1, Some(10), "east"),
        User::new(2, Some(10), "west"),
        User::new(3, Some(20), "east"),
    ]
}

pub fn run<F: Future>(f: F) -> F::Output {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(f)
}

pub fn unwrap_outcome<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(value) => value,
        other => panic!("unexpected outcome: {other:?}"),
    }
}
