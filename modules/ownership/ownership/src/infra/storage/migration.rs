//! Schema for the ownership table and the inline owner columns.

use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;

use super::schema::{OwnerColumns, Ownerships};

/// Creates the ownership table under a configurable name.
pub struct CreateOwnershipTable {
    table: String,
}

impl CreateOwnershipTable {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    fn unique_index(&self) -> String {
        format!("{}_unique", self.table)
    }
}

impl MigrationName for CreateOwnershipTable {
    fn name(&self) -> &str {
        "m20240101_000001_create_ownerships_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateOwnershipTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Alias::new(&self.table);

        manager
            .create_table(
                Table::create()
                    .table(table.clone())
                    .if_not_exists()
                    .col(ColumnDef::new(Ownerships::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Ownerships::OwnableType).string().not_null())
                    .col(ColumnDef::new(Ownerships::OwnableId).string().not_null())
                    .col(ColumnDef::new(Ownerships::OwnerType).string().not_null())
                    .col(ColumnDef::new(Ownerships::OwnerId).string().not_null())
                    .col(ColumnDef::new(Ownerships::Role).string().null())
                    .col(ColumnDef::new(Ownerships::Permissions).text().null())
                    .col(
                        ColumnDef::new(Ownerships::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Ownerships::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One record per (resource, owner).
        manager
            .create_index(
                Index::create()
                    .name(self.unique_index())
                    .table(table.clone())
                    .col(Ownerships::OwnableType)
                    .col(Ownerships::OwnableId)
                    .col(Ownerships::OwnerType)
                    .col(Ownerships::OwnerId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(format!("{}_owner_index", self.table))
                    .table(table)
                    .col(Ownerships::OwnerType)
                    .col(Ownerships::OwnerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new(&self.table))
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

/// Migrator for the default `ownerships` table name.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateOwnershipTable::new("ownerships"))]
    }
}

/// Create the ownership table `table` if it does not exist yet.
///
/// # Errors
///
/// Returns the database error of the failing DDL statement.
pub async fn install(db: &DatabaseConnection, table: &str) -> Result<(), DbErr> {
    let manager = SchemaManager::new(db);
    CreateOwnershipTable::new(table).up(&manager).await?;
    tracing::info!(table, "ownership table installed");
    Ok(())
}

/// Add nullable `{morph}_type` / `{morph}_id` columns and their index to an
/// existing ownable table (single mode).
///
/// # Errors
///
/// Returns the database error of the failing DDL statement.
pub async fn add_owner_columns(
    manager: &SchemaManager<'_>,
    table: &str,
    morph_name: &str,
) -> Result<(), DbErr> {
    let columns = OwnerColumns::for_morph(morph_name);

    // SQLite accepts a single column per ALTER TABLE.
    for column in [columns.owner_type.clone(), columns.owner_id.clone()] {
        manager
            .alter_table(
                Table::alter()
                    .table(Alias::new(table))
                    .add_column(ColumnDef::new(column).string().null())
                    .to_owned(),
            )
            .await?;
    }

    manager
        .create_index(
            Index::create()
                .name(OwnerColumns::index_name(table, morph_name))
                .table(Alias::new(table))
                .col(columns.owner_type)
                .col(columns.owner_id)
                .to_owned(),
        )
        .await
}

/// Drop the inline owner columns added by [`add_owner_columns`].
///
/// # Errors
///
/// Returns the database error of the failing DDL statement.
pub async fn drop_owner_columns(
    manager: &SchemaManager<'_>,
    table: &str,
    morph_name: &str,
) -> Result<(), DbErr> {
    let columns = OwnerColumns::for_morph(morph_name);

    manager
        .drop_index(
            Index::drop()
                .name(OwnerColumns::index_name(table, morph_name))
                .table(Alias::new(table))
                .to_owned(),
        )
        .await?;

    for column in [columns.owner_type, columns.owner_id] {
        manager
            .alter_table(
                Table::alter()
                    .table(Alias::new(table))
                    .drop_column(column)
                    .to_owned(),
            )
            .await?;
    }
    Ok(())
}
