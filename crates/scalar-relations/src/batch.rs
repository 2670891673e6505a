//! Batch resolution: one grouped query per relation for a slice of entities.
//!
//! Resolution runs in two phases. Planning resolves every requested
//! definition, reads every pending entity's group key and builds every
//! grouped query; any configuration error surfaces here, before a single
//! query executes or a single entity is touched. Execution then runs the
//! planned queries one after another, indexes each result by group key and
//! writes the values into the entities' caches.

use crate::cache::ScalarModel;
use crate::definition::{GroupAttribute, MissingPolicy};
use crate::group_key::{GroupKey, distinct_non_null, entity_values};
use crate::resolver::ScalarResolver;
use asupersync::{Cx, Outcome};
use scalar_relations_core::{Connection, Dialect, Error, Result, Row, Value};
use scalar_relations_query::{Expr, Select};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// An entity that still needs the relation.
struct Pending {
    index: usize,
    values: Vec<Value>,
    key: GroupKey,
}

/// A relation ready to execute against the batch.
struct RelationPlan<M: ScalarModel> {
    relation: String,
    attributes: Vec<GroupAttribute>,
    missing: MissingPolicy,
    pending: Vec<Pending>,
    /// `None` when every entity already caches the relation
    query: Option<Select<M>>,
}

impl ScalarResolver<'_> {
    /// Resolve `relations` for every entity in `entities`.
    ///
    /// Issues at most one query per relation regardless of batch size. When a
    /// relation's query fails, the remaining relations are still resolved and
    /// the first failure is returned; relations resolved before it stay
    /// cached. Cancellation and panics end resolution immediately.
    #[tracing::instrument(
        level = "debug",
        skip(self, cx, conn, entities),
        fields(entity = M::entity_name(), batch = entities.len())
    )]
    pub async fn resolve_batch<M, C>(
        &self,
        cx: &Cx,
        conn: &C,
        entities: &mut [M],
        relations: &[&str],
    ) -> Outcome<(), Error>
    where
        M: ScalarModel + 'static,
        C: Connection,
    {
        if entities.is_empty() || relations.is_empty() {
            tracing::debug!("Nothing to resolve");
            return Outcome::Ok(());
        }

        let plans = match self.plan_batch(entities, relations, conn.dialect()) {
            Ok(plans) => plans,
            Err(e) => {
                tracing::debug!(error = %e, "Batch resolution rejected during planning");
                return Outcome::Err(e);
            }
        };

        let mut first_error = None;
        for plan in plans {
            let relation = plan.relation.clone();
            match execute_plan(cx, conn, entities, plan).await {
                Outcome::Ok(()) => {}
                Outcome::Err(e) => {
                    tracing::warn!(relation = %relation, error = %e, "Scalar relation failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        match first_error {
            Some(e) => Outcome::Err(e),
            None => Outcome::Ok(()),
        }
    }

    #[allow(clippy::result_large_err)]
    fn plan_batch<M: ScalarModel + 'static>(
        &self,
        entities: &[M],
        relations: &[&str],
        dialect: Dialect,
    ) -> Result<Vec<RelationPlan<M>>> {
        let mut plans: Vec<RelationPlan<M>> = Vec::with_capacity(relations.len());

        for &name in relations {
            if plans.iter().any(|p| p.relation == name) {
                continue;
            }

            let definition = self.registry.resolve_definition::<M>(name)?;
            let aggregate = definition.build_query()?;
            let attributes = definition.group_attributes().to_vec();

            let mut pending = Vec::new();
            for (index, entity) in entities.iter().enumerate() {
                if self.config.skip_cached && entity.get_cached(name).is_some() {
                    continue;
                }
                let values = entity_values(&attributes, entity)?;
                let key = GroupKey::from_values(&values);
                pending.push(Pending { index, values, key });
            }

            let query = if pending.is_empty() {
                None
            } else {
                Some(grouped_query(
                    dialect,
                    name,
                    &attributes,
                    aggregate.query,
                    &aggregate.expression,
                    &pending,
                ))
            };

            tracing::debug!(
                relation = name,
                pending = pending.len(),
                cached = entities.len() - pending.len(),
                "Planned scalar relation"
            );

            plans.push(RelationPlan {
                relation: name.to_string(),
                attributes,
                missing: self.missing_policy(definition).clone(),
                pending,
                query,
            });
        }

        Ok(plans)
    }
}

/// Reshape a single-expression aggregate into a grouped batch query.
///
/// SELECT becomes the quoted group attributes plus the aggregate aliased to
/// the quoted relation name. The group attributes are appended to the
/// author's GROUP BY, and each attribute is bounded to the batch's distinct
/// non-NULL values.
fn grouped_query<M: ScalarModel>(
    dialect: Dialect,
    relation: &str,
    attributes: &[GroupAttribute],
    mut query: Select<M>,
    expression: &str,
    pending: &[Pending],
) -> Select<M> {
    let mut columns: Vec<String> = attributes.iter().map(|a| a.quoted(dialect)).collect();
    columns.push(format!(
        "{expression} AS {}",
        dialect.quote_identifier(relation)
    ));
    query.set_columns(columns);

    let mut group_by = query.group_by_columns().to_vec();
    for attr in attributes {
        let quoted = attr.quoted(dialect);
        if !group_by.iter().any(|g| g == attr.qualified() || *g == quoted) {
            group_by.push(quoted);
        }
    }
    query.set_group_by(group_by);

    for (i, attr) in attributes.iter().enumerate() {
        let distinct = distinct_non_null(pending.iter().filter_map(|p| p.values.get(i)));
        if distinct.is_empty() {
            continue;
        }
        tracing::trace!(
            relation = relation,
            attribute = attr.qualified(),
            distinct = distinct.len(),
            "Bounding grouped query"
        );
        query = query.filter(Expr::qualified(attr.table(), attr.bare()).in_list(distinct));
    }

    query
}

/// Index grouped rows by key. The first row for a key wins.
#[allow(clippy::result_large_err)]
fn index_rows(
    relation: &str,
    attributes: &[GroupAttribute],
    rows: &[Row],
) -> Result<HashMap<GroupKey, Value>> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        let key = GroupKey::for_row(attributes, row)?;
        let value = row
            .get_by_name(relation)
            .or_else(|| row.get(attributes.len()))
            .cloned()
            .ok_or_else(|| {
                Error::Type(scalar_relations_core::TypeError {
                    expected: "aggregate column",
                    actual: format!("column '{relation}' not found in result row"),
                    column: Some(relation.to_string()),
                })
            })?;

        match index.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(slot) => {
                tracing::warn!(
                    relation = relation,
                    key = ?slot.key(),
                    "Several rows share one group key; keeping the first"
                );
            }
        }
    }
    Ok(index)
}

async fn execute_plan<M, C>(
    cx: &Cx,
    conn: &C,
    entities: &mut [M],
    plan: RelationPlan<M>,
) -> Outcome<(), Error>
where
    M: ScalarModel,
    C: Connection,
{
    let RelationPlan {
        relation,
        attributes,
        missing,
        pending,
        query,
    } = plan;

    let Some(query) = query else {
        tracing::debug!(relation = %relation, "Relation already cached for the whole batch");
        return Outcome::Ok(());
    };

    let rows = match query.rows(cx, conn).await {
        Outcome::Ok(rows) => rows,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };

    let index = match index_rows(&relation, &attributes, &rows) {
        Ok(index) => index,
        Err(e) => return Outcome::Err(e),
    };

    let mut matched = 0usize;
    let mut filled = 0usize;
    for Pending { index: at, key, .. } in pending {
        let Some(entity) = entities.get_mut(at) else {
            continue;
        };
        if let Some(value) = index.get(&key) {
            entity.set_cached(&relation, value.clone());
            matched += 1;
        } else if let Some(value) = missing.fill_value() {
            entity.set_cached(&relation, value.clone());
            filled += 1;
        }
    }

    tracing::debug!(
        relation = %relation,
        rows = rows.len(),
        matched = matched,
        filled = filled,
        "Resolved scalar relation"
    );

    Outcome::Ok(())
}
