//! Entity queries that resolve their scalar relations on load.

mod common;

use asupersync::Cx;
use common::{MockConnection, User, branch_row, registry, run, unwrap_outcome};
use scalar_relations::prelude::*;

fn user_row(id: i64, branch: Option<i64>, region: &str) -> Row {
    Row::new(
        vec!["id".into(), "branch_id".into(), "region".into()],
        vec![Value::BigInt(id), branch.into(), Value::Text(region.into())],
    )
}

#[test]
fn loaded_models_carry_requested_relations() {
    let registry = registry();
    let conn = MockConnection::new();
    conn.respond(
        "SELECT * FROM users",
        vec![
            user_row(1, Some(10), "east"),
            user_row(2, Some(10), "west"),
            user_row(3, Some(20), "east"),
        ],
    );
    conn.respond(
        "AS \"active_orders\"",
        vec![branch_row(10, "active_orders", Value::BigInt(5))],
    );
    let cx = Cx::for_testing();

    let users = run(async {
        let resolver = ScalarResolver::new(&registry);
        let query = Select::<User>::new()
            .filter(Expr::qualified("users", "region").in_list(vec!["east", "west"]))
            .with_scalar(&["active_orders", "order_total"]);
        unwrap_outcome(resolver.load_all(&cx, &conn, query).await)
    });

    assert_eq!(conn.calls(), 3);
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, [1, 2, 3]);
    let active: Vec<_> = users
        .iter()
        .map(|u| u.get_cached("active_orders").cloned())
        .collect();
    assert_eq!(
        active,
        [
            Some(Value::BigInt(5)),
            Some(Value::BigInt(5)),
            Some(Value::BigInt(0))
        ]
    );
    assert!(users.iter().all(|u| u.get_cached("order_total").is_some()));

    let executed = conn.executed();
    assert!(executed[0].0.starts_with("SELECT * FROM users WHERE"));
    assert!(executed[1].0.contains("AS \"active_orders\""));
    assert!(executed[2].0.contains("AS \"order_total\""));
}

#[test]
fn plain_query_and_empty_result_run_only_the_entity_query() {
    let registry = registry();
    let conn = MockConnection::new();
    conn.respond("SELECT * FROM users", vec![user_row(1, Some(10), "east")]);
    let no_users = MockConnection::new();
    let cx = Cx::for_testing();

    let (plain, empty) = run(async {
        let resolver = ScalarResolver::new(&registry);
        let plain = unwrap_outcome(resolver.load_all(&cx, &conn, Select::<User>::new()).await);
        let empty = unwrap_outcome(
            resolver
                .load_all(
                    &cx,
                    &no_users,
                    Select::<User>::new().with_scalar(&["active_orders"]),
                )
                .await,
        );
        (plain, empty)
    });

    assert_eq!(plain.len(), 1);
    assert!(plain[0].scalars.is_empty());
    assert_eq!(conn.calls(), 1);
    assert!(empty.is_empty());
    assert_eq!(no_users.calls(), 1);
}

#[test]
fn unknown_relation_fails_the_load() {
    let registry = registry();
    let conn = MockConnection::new();
    conn.respond("SELECT * FROM users", vec![user_row(1, Some(10), "east")]);
    let cx = Cx::for_testing();

    let outcome = run(async {
        let resolver = ScalarResolver::new(&registry);
        resolver
            .load_all(
                &cx,
                &conn,
                Select::<User>::new().with_scalar(&["lifetime_value"]),
            )
            .await
    });

    match outcome {
        Outcome::Err(Error::NotFound(e)) => assert_eq!(e.relation, "lifetime_value"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(conn.calls(), 1);
}
