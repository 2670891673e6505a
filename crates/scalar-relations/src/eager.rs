//! Query-level loading of scalar relations.
//!
//! An entity query names its scalar relations with
//! [`Select::with_scalar`]; [`ScalarResolver::load_all`] runs it and resolves
//! those relations on the loaded models in one batch.
//!
//! ```ignore
//! let query = Select::<User>::new()
//!     .filter(Expr::col("active").eq(true))
//!     .with_scalar(&["active_orders", "order_total"]);
//! let users = resolver.load_all(&cx, &conn, query).await;
//! ```

use crate::cache::ScalarModel;
use crate::resolver::ScalarResolver;
use asupersync::{Cx, Outcome};
use scalar_relations_core::{Connection, Error};
use scalar_relations_query::Select;

impl ScalarResolver<'_> {
    /// Execute `query` and resolve its requested scalar relations on the
    /// loaded models.
    ///
    /// Costs one query for the models plus at most one per relation. No
    /// models means no relation queries. A relation failure fails the load.
    #[tracing::instrument(
        level = "debug",
        skip(self, cx, conn, query),
        fields(entity = M::entity_name(), relations = query.scalar_relations().len())
    )]
    pub async fn load_all<M, C>(
        &self,
        cx: &Cx,
        conn: &C,
        query: Select<M>,
    ) -> Outcome<Vec<M>, Error>
    where
        M: ScalarModel + 'static,
        C: Connection,
    {
        let relations = query.scalar_relations().to_vec();

        let mut models = match query.all(cx, conn).await {
            Outcome::Ok(models) => models,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        if relations.is_empty() || models.is_empty() {
            tracing::trace!(models = models.len(), "No scalar relations to resolve");
            return Outcome::Ok(models);
        }

        let names: Vec<&str> = relations.iter().map(String::as_str).collect();
        match self.resolve_batch(cx, conn, &mut models, &names).await {
            Outcome::Ok(()) => Outcome::Ok(models),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }
}
