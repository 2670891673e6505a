//! Relation registry.
//!
//! Maps (entity type, relation name) to a [`RelationDefinition`]. Entries are
//! registered once, typically at startup, and are read-only afterwards, so a
//! populated registry can be shared by reference across resolvers.

use crate::definition::RelationDefinition;
use scalar_relations_core::error::{NotFoundError, TypeMismatchError};
use scalar_relations_core::{Error, Model, Result};
use scalar_relations_query::Select;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// A type-erased definition stored under its entity's `TypeId`.
struct Entry {
    entity: &'static str,
    definition: Box<dyn Any + Send + Sync>,
}

/// Registered scalar relations for any number of entity types.
///
/// # Example
///
/// ```ignore
/// let mut registry = RelationRegistry::new();
/// registry.define::<User>("active_orders", Some(&["branch_id"]), || {
///     Select::new()
///         .columns(&["COUNT(*)"])
///         .join(Join::inner("orders", Expr::raw("orders.user_id = users.id")))
///         .filter(Expr::qualified("orders", "status").eq("active"))
/// })?;
/// ```
#[derive(Default)]
pub struct RelationRegistry {
    relations: HashMap<TypeId, HashMap<String, Entry>>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a relation on `M`.
    ///
    /// `group_attributes` defaults to `M::PRIMARY_KEY` when `None`. An empty
    /// list or an already-defined name is a configuration error.
    #[allow(clippy::result_large_err)]
    pub fn define<M: Model + 'static>(
        &mut self,
        name: &str,
        group_attributes: Option<&[&str]>,
        factory: impl Fn() -> Select<M> + Send + Sync + 'static,
    ) -> Result<()> {
        let definition = RelationDefinition::new(name, group_attributes, factory)?;
        self.register(definition)
    }

    /// Register a prebuilt definition.
    #[allow(clippy::result_large_err)]
    pub fn register<M: Model + 'static>(&mut self, definition: RelationDefinition<M>) -> Result<()> {
        let relations = self.relations.entry(TypeId::of::<M>()).or_default();
        if relations.contains_key(definition.name()) {
            return Err(Error::config(format!(
                "relation '{}' is already defined for {}",
                definition.name(),
                M::entity_name()
            )));
        }

        tracing::debug!(
            entity = M::entity_name(),
            relation = definition.name(),
            group = ?definition
                .group_attributes()
                .iter()
                .map(|a| a.qualified())
                .collect::<Vec<_>>(),
            "Defined scalar relation"
        );

        relations.insert(
            definition.name().to_string(),
            Entry {
                entity: M::entity_name(),
                definition: Box::new(definition),
            },
        );
        Ok(())
    }

    /// Look up a relation on `M`.
    #[allow(clippy::result_large_err)]
    pub fn resolve_definition<M: Model + 'static>(
        &self,
        name: &str,
    ) -> Result<&RelationDefinition<M>> {
        let entry = self
            .relations
            .get(&TypeId::of::<M>())
            .and_then(|relations| relations.get(name))
            .ok_or_else(|| {
                Error::NotFound(NotFoundError {
                    relation: name.to_string(),
                    entity: M::entity_name().to_string(),
                })
            })?;

        entry
            .definition
            .downcast_ref::<RelationDefinition<M>>()
            .ok_or_else(|| {
                Error::TypeMismatch(TypeMismatchError {
                    relation: name.to_string(),
                    entity: entry.entity.to_string(),
                    expected: std::any::type_name::<Select<M>>(),
                })
            })
    }

    /// Whether `M` has a relation with this name.
    pub fn contains<M: Model + 'static>(&self, name: &str) -> bool {
        self.relations
            .get(&TypeId::of::<M>())
            .is_some_and(|relations| relations.contains_key(name))
    }

    /// Names of the relations defined on `M`, sorted.
    pub fn relation_names<M: Model + 'static>(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .relations
            .get(&TypeId::of::<M>())
            .map(|relations| relations.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Total number of relations across all entity types.
    pub fn len(&self) -> usize {
        self.relations.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RelationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for relations in self.relations.values() {
            for (name, entry) in relations {
                map.entry(&entry.entity, name);
            }
        }
        map.finish()
    }
}
