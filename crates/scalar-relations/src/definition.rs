//! Relation definitions.
//!
//! A [`RelationDefinition`] names one scalar relation on an entity type: the
//! attributes its aggregate is grouped by, a factory producing the
//! single-expression aggregate query, and optionally what to cache for
//! entities whose group produced no row.

use scalar_relations_core::{Dialect, Error, Model, Result, Value};
use scalar_relations_query::Select;
use std::fmt;
use std::sync::Arc;

/// Builds a fresh aggregate query for a relation.
///
/// The query carries the author's joins and filters and selects exactly one
/// expression, the aggregate.
pub type QueryFactory<M> = Arc<dyn Fn() -> Select<M> + Send + Sync>;

/// What to cache for an entity whose group key matched no result row.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingPolicy {
    /// Cache this value ("no rows" reads as a count or sum of zero by default).
    Fill(Value),
    /// Leave the relation unresolved on the entity.
    LeaveUnresolved,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        MissingPolicy::Fill(Value::BigInt(0))
    }
}

impl MissingPolicy {
    /// The fill value, if this policy fills.
    pub fn fill_value(&self) -> Option<&Value> {
        match self {
            MissingPolicy::Fill(value) => Some(value),
            MissingPolicy::LeaveUnresolved => None,
        }
    }
}

/// One group attribute: the table-qualified column used in SQL and the bare
/// name used to read entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAttribute {
    table: String,
    bare: String,
    qualified: String,
}

impl GroupAttribute {
    /// Qualify `name` with `table`, unless it is already qualified.
    pub fn new(table: &str, name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((owner, bare)) => Self {
                table: owner.to_string(),
                bare: bare.to_string(),
                qualified: name.to_string(),
            },
            None => Self {
                table: table.to_string(),
                bare: name.to_string(),
                qualified: format!("{table}.{name}"),
            },
        }
    }

    /// The table (or alias) owning the column.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The unqualified attribute name.
    pub fn bare(&self) -> &str {
        &self.bare
    }

    /// `table.attribute`, as the relation's author wrote it.
    pub fn qualified(&self) -> &str {
        &self.qualified
    }

    /// The qualified column quoted for `dialect`, as written into SELECT and
    /// GROUP BY. Matches how `Expr::qualified` renders it in WHERE.
    pub fn quoted(&self, dialect: Dialect) -> String {
        format!(
            "{}.{}",
            dialect.quote_identifier(&self.table),
            dialect.quote_identifier(&self.bare)
        )
    }
}

/// Resolve the group attributes of a relation on `M`.
///
/// `None` means "group by the primary key".
#[allow(clippy::result_large_err)]
pub fn group_attributes<M: Model>(
    relation: &str,
    names: Option<&[&str]>,
) -> Result<Vec<GroupAttribute>> {
    let names = names.unwrap_or(M::PRIMARY_KEY);
    if names.is_empty() {
        return Err(Error::config(format!(
            "relation '{}' on {} has no group attributes",
            relation,
            M::entity_name()
        )));
    }
    if let Some(blank) = names.iter().find(|n| n.trim().is_empty() || n.ends_with('.')) {
        return Err(Error::config(format!(
            "relation '{}' on {} has an invalid group attribute '{}'",
            relation,
            M::entity_name(),
            blank
        )));
    }
    Ok(names
        .iter()
        .map(|name| GroupAttribute::new(M::TABLE_NAME, name))
        .collect())
}

/// An aggregate query ready to be reshaped, plus its single select expression.
#[derive(Debug)]
pub struct AggregateQuery<M: Model> {
    pub query: Select<M>,
    pub expression: String,
}

/// A named scalar relation on entity type `M`. Immutable once registered.
pub struct RelationDefinition<M: Model> {
    name: String,
    group: Vec<GroupAttribute>,
    factory: QueryFactory<M>,
    missing: Option<MissingPolicy>,
}

impl<M: Model> RelationDefinition<M> {
    /// Create a definition, validating its group attributes.
    #[allow(clippy::result_large_err)]
    pub fn new(
        name: impl Into<String>,
        names: Option<&[&str]>,
        factory: impl Fn() -> Select<M> + Send + Sync + 'static,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::config(format!(
                "relation on {} needs a name",
                M::entity_name()
            )));
        }
        let group = group_attributes::<M>(&name, names)?;
        Ok(Self {
            name,
            group,
            factory: Arc::new(factory),
            missing: None,
        })
    }

    /// Override the resolver's missing-row policy for this relation.
    pub fn with_missing(mut self, policy: MissingPolicy) -> Self {
        self.missing = Some(policy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_attributes(&self) -> &[GroupAttribute] {
        &self.group
    }

    pub fn missing(&self) -> Option<&MissingPolicy> {
        self.missing.as_ref()
    }

    /// Run the factory and check that it selects exactly one expression.
    #[allow(clippy::result_large_err)]
    pub fn build_query(&self) -> Result<AggregateQuery<M>> {
        let query = (self.factory)();
        match query.selected_columns() {
            [expression] => {
                let expression = expression.clone();
                Ok(AggregateQuery { query, expression })
            }
            other => Err(Error::config(format!(
                "relation '{}' on {} must select exactly one expression, found {}",
                self.name,
                M::entity_name(),
                other.len()
            ))),
        }
    }
}

impl<M: Model> Clone for RelationDefinition<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            group: self.group.clone(),
            factory: Arc::clone(&self.factory),
            missing: self.missing.clone(),
        }
    }
}

impl<M: Model> fmt::Debug for RelationDefinition<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDefinition")
            .field("entity", &M::entity_name())
            .field("name", &self.name)
            .field("group", &self.group)
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}
