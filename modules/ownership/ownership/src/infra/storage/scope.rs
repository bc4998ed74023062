//! Turns an [`OwnedByScope`] into a row filter for an ownable table.

use sea_orm::DbBackend;
use sea_orm::sea_query::{Alias, Condition, Expr, Query};

use super::schema::{OwnerColumns, Ownerships, id_as_text};
use crate::domain::engine::OwnedByScope;

/// Where the ownable rows and their ownership records live.
#[derive(Debug, Clone)]
pub struct ScopeTarget {
    pub resource_type: String,
    pub table: String,
    pub id_column: String,
    pub morph_name: String,
    pub ownership_table: String,
    /// Picks the text type ids are cast to; only MySQL differs.
    pub backend: DbBackend,
}

impl ScopeTarget {
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        table: impl Into<String>,
        morph_name: impl Into<String>,
        ownership_table: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            table: table.into(),
            id_column: "id".to_owned(),
            morph_name: morph_name.into(),
            ownership_table: ownership_table.into(),
            backend: DbBackend::Sqlite,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: DbBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Row id as text, comparable with `ownable_id`.
    fn row_id(&self, table: Alias) -> Expr {
        Expr::expr(id_as_text((table, Alias::new(&self.id_column)), self.backend))
    }

    /// Filter matching the rows visible under `scope`.
    #[must_use]
    pub fn condition(&self, scope: &OwnedByScope) -> Condition {
        let table = Alias::new(&self.table);
        match scope {
            OwnedByScope::Unrestricted => Condition::all(),
            OwnedByScope::InlineOwner(owner) => {
                let columns = OwnerColumns::for_morph(&self.morph_name);
                Condition::all()
                    .add(Expr::col((table.clone(), columns.owner_type)).eq(owner.owner_type()))
                    .add(Expr::col((table, columns.owner_id)).eq(owner.owner_id()))
            }
            OwnedByScope::OwnershipRecord(owner) => {
                let records = Query::select()
                    .column(Ownerships::OwnableId)
                    .from(Alias::new(&self.ownership_table))
                    .and_where(Expr::col(Ownerships::OwnableType).eq(self.resource_type.as_str()))
                    .and_where(Expr::col(Ownerships::OwnerType).eq(owner.owner_type()))
                    .and_where(Expr::col(Ownerships::OwnerId).eq(owner.owner_id()))
                    .to_owned();
                Condition::all().add(self.row_id(table).in_subquery(records))
            }
            OwnedByScope::AnyOwnershipRecord => {
                let records = Query::select()
                    .column(Ownerships::OwnableId)
                    .from(Alias::new(&self.ownership_table))
                    .and_where(Expr::col(Ownerships::OwnableType).eq(self.resource_type.as_str()))
                    .to_owned();
                Condition::all().add(self.row_id(table).in_subquery(records))
            }
        }
    }
}
