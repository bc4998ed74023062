//! Persists the inline owner columns of an ownable table (single mode).

use async_trait::async_trait;
use ownership_security::{OwnerRef, ResourceRef};
use sea_orm::sea_query::{Alias, Expr, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, DatabaseConnection};

use super::schema::{OwnerColumns, id_as_text};
use crate::domain::repo::ResourceStore;

/// Writes `{morph}_type` / `{morph}_id` of one ownable table.
///
/// Rows are matched on `id_column`, cast to text, against the resource id.
#[derive(Clone)]
pub struct SeaOrmResourceStore {
    db: DatabaseConnection,
    resource_type: String,
    table: String,
    id_column: String,
    columns: OwnerColumns,
}

impl SeaOrmResourceStore {
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        resource_type: impl Into<String>,
        table: impl Into<String>,
        morph_name: &str,
    ) -> Self {
        Self {
            db,
            resource_type: resource_type.into(),
            table: table.into(),
            id_column: "id".to_owned(),
            columns: OwnerColumns::for_morph(morph_name),
        }
    }

    #[must_use]
    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }
}

#[async_trait]
impl ResourceStore for SeaOrmResourceStore {
    async fn save_owner(
        &self,
        resource: &ResourceRef,
        owner: Option<&OwnerRef>,
    ) -> anyhow::Result<bool> {
        anyhow::ensure!(
            resource.resource_type() == self.resource_type,
            "resource {resource} does not live in table {}",
            self.table
        );

        let (owner_type, owner_id): (SimpleExpr, SimpleExpr) = match owner {
            Some(owner) => (owner.owner_type().into(), owner.owner_id().into()),
            None => (Option::<String>::None.into(), Option::<String>::None.into()),
        };
        let backend = self.db.get_database_backend();
        let stmt = Query::update()
            .table(Alias::new(&self.table))
            .values([
                (self.columns.owner_type.clone(), owner_type),
                (self.columns.owner_id.clone(), owner_id),
            ])
            .and_where(
                Expr::expr(id_as_text(Alias::new(&self.id_column), backend))
                    .eq(resource.resource_id()),
            )
            .to_owned();

        let result = self.db.execute(backend.build(&stmt)).await?;
        if result.rows_affected() == 0 {
            tracing::warn!(resource = %resource, table = %self.table, "no row to update");
        }
        Ok(result.rows_affected() > 0)
    }
}
