//! Column identifiers of the ownership table.
//!
//! The table name comes from configuration, so it is always passed as an
//! [`Alias`] next to these identifiers.

use sea_orm::sea_query::{Alias, Expr, IntoColumnRef, SimpleExpr};
use sea_orm::{DbBackend, DeriveIden};

#[derive(DeriveIden, Debug, Clone, Copy)]
pub enum Ownerships {
    Id,
    OwnableType,
    OwnableId,
    OwnerType,
    OwnerId,
    Role,
    Permissions,
    CreatedAt,
    UpdatedAt,
}

impl Ownerships {
    pub const ALL: [Ownerships; 9] = [
        Ownerships::Id,
        Ownerships::OwnableType,
        Ownerships::OwnableId,
        Ownerships::OwnerType,
        Ownerships::OwnerId,
        Ownerships::Role,
        Ownerships::Permissions,
        Ownerships::CreatedAt,
        Ownerships::UpdatedAt,
    ];
}

/// Inline owner columns of an ownable table: `{morph}_type` and `{morph}_id`.
#[derive(Debug, Clone)]
pub struct OwnerColumns {
    pub owner_type: Alias,
    pub owner_id: Alias,
}

impl OwnerColumns {
    #[must_use]
    pub fn for_morph(morph_name: &str) -> Self {
        Self {
            owner_type: Alias::new(format!("{morph_name}_type")),
            owner_id: Alias::new(format!("{morph_name}_id")),
        }
    }

    /// Index over both columns, e.g. `posts_owner_type_owner_id_index`.
    ///
    /// Index names share one namespace per database, so the table is part of it.
    #[must_use]
    pub fn index_name(table: &str, morph_name: &str) -> String {
        format!("{table}_{morph_name}_type_{morph_name}_id_index")
    }
}

/// `column` cast to text, so ownable ids of any key type compare with the
/// text `ownable_id` column and with ids taken from a [`ResourceRef`].
///
/// [`ResourceRef`]: ownership_security::ResourceRef
#[must_use]
pub fn id_as_text(column: impl IntoColumnRef, backend: DbBackend) -> SimpleExpr {
    let text = if backend == DbBackend::MySql { "CHAR" } else { "TEXT" };
    Expr::col(column).cast_as(Alias::new(text))
}
