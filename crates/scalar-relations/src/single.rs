//! Single-entity resolution by primary key.

use crate::cache::ScalarModel;
use crate::definition::MissingPolicy;
use crate::resolver::ScalarResolver;
use asupersync::{Cx, Outcome};
use scalar_relations_core::{Connection, Error, Value};
use scalar_relations_query::Expr;
use std::panic::Location;

impl ScalarResolver<'_> {
    /// Resolve one relation for one entity.
    ///
    /// Returns the cached value when there is one. Otherwise runs the
    /// relation's aggregate filtered to the entity's primary key, caches the
    /// result and returns it. With no result row the missing-row policy
    /// applies: `Fill(v)` caches and returns `v`, `LeaveUnresolved` returns
    /// `Value::Null` and caches nothing.
    ///
    /// Every query issued here counts towards N+1 detection.
    #[track_caller]
    pub fn resolve_one<'a, M, C>(
        &'a mut self,
        cx: &'a Cx,
        conn: &'a C,
        entity: &'a mut M,
        relation: &'a str,
    ) -> impl Future<Output = Outcome<Value, Error>> + 'a
    where
        M: ScalarModel + 'static,
        C: Connection,
    {
        let caller = Location::caller();
        self.resolve_one_from(cx, conn, entity, relation, caller)
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, cx, conn, entity, caller),
        fields(entity = M::entity_name())
    )]
    async fn resolve_one_from<M, C>(
        &mut self,
        cx: &Cx,
        conn: &C,
        entity: &mut M,
        relation: &str,
        caller: &'static Location<'static>,
    ) -> Outcome<Value, Error>
    where
        M: ScalarModel + 'static,
        C: Connection,
    {
        if let Some(value) = entity.get_cached(relation) {
            tracing::trace!("Scalar cache hit");
            return Outcome::Ok(value.clone());
        }

        let registry = self.registry;
        let definition = match registry.resolve_definition::<M>(relation) {
            Ok(definition) => definition,
            Err(e) => return Outcome::Err(e),
        };
        let mut query = match definition.build_query() {
            Ok(aggregate) => aggregate.query,
            Err(e) => return Outcome::Err(e),
        };

        for (column, value) in M::PRIMARY_KEY.iter().zip(entity.primary_key_value()) {
            let column = Expr::qualified(M::TABLE_NAME, *column);
            query = query.filter(if value.is_null() {
                column.is_null()
            } else {
                column.eq(value)
            });
        }

        if let Some(tracker) = self.n1.as_mut() {
            tracker.record_load_at(M::entity_name(), relation, caller);
        }

        let found = match query.scalar(cx, conn).await {
            Outcome::Ok(found) => found,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let value = match (found, self.missing_policy(definition)) {
            (Some(value), _) => value,
            (None, MissingPolicy::Fill(value)) => value.clone(),
            (None, MissingPolicy::LeaveUnresolved) => {
                tracing::debug!(relation = relation, "No row; leaving relation unresolved");
                return Outcome::Ok(Value::Null);
            }
        };

        entity.set_cached(relation, value.clone());
        Outcome::Ok(value)
    }
}
