//! SeaORM implementation of the ownership repository.
//!
//! The table name is configurable, so statements are built with `sea_query`
//! against an [`Alias`] and rows are read through `FromQueryResult`.

use std::collections::HashSet;

use anyhow::Context;
use async_trait::async_trait;
use ownership_sdk::OwnershipRecord;
use ownership_security::{OwnerRef, ResourceRef};
use sea_orm::sea_query::{
    Alias, Condition, Expr, InsertStatement, Order, Query, SelectStatement, SimpleExpr,
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, FromQueryResult, SqlErr, TransactionTrait,
};
use time::OffsetDateTime;
use uuid::Uuid;

use super::schema::Ownerships;
use crate::domain::repo::{
    InsertOutcome, NewOwnership, OwnershipFilter, OwnershipRepository, ReassignOutcome,
};

#[derive(Debug, FromQueryResult)]
struct OwnershipRow {
    id: Uuid,
    ownable_type: String,
    ownable_id: String,
    owner_type: String,
    owner_id: String,
    role: Option<String>,
    permissions: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl OwnershipRow {
    fn into_record(self) -> anyhow::Result<OwnershipRecord> {
        let permissions = self
            .permissions
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()
            .with_context(|| format!("malformed permission overrides in record {}", self.id))?;
        Ok(OwnershipRecord {
            id: self.id,
            resource: ResourceRef::new(self.ownable_type, self.ownable_id),
            owner: OwnerRef::new(self.owner_type, self.owner_id),
            role: self.role,
            permissions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn encode_permissions(permissions: Option<&Vec<String>>) -> anyhow::Result<Option<String>> {
    permissions
        .map(serde_json::to_string)
        .transpose()
        .context("failed to encode permission overrides")
}

fn resource_cond(resource: &ResourceRef) -> Condition {
    Condition::all()
        .add(Expr::col(Ownerships::OwnableType).eq(resource.resource_type()))
        .add(Expr::col(Ownerships::OwnableId).eq(resource.resource_id()))
}

fn owner_cond(resource: &ResourceRef, owner: &OwnerRef) -> Condition {
    resource_cond(resource)
        .add(Expr::col(Ownerships::OwnerType).eq(owner.owner_type()))
        .add(Expr::col(Ownerships::OwnerId).eq(owner.owner_id()))
}

fn new_record(new: NewOwnership, now: OffsetDateTime) -> OwnershipRecord {
    OwnershipRecord {
        id: Uuid::new_v4(),
        resource: new.resource,
        owner: new.owner,
        role: Some(new.role),
        permissions: new.permissions,
        created_at: now,
        updated_at: now,
    }
}

/// Ownership table backed by a SeaORM connection.
#[derive(Clone)]
pub struct SeaOrmOwnershipRepository {
    db: DatabaseConnection,
    table: String,
}

impl SeaOrmOwnershipRepository {
    #[must_use]
    pub fn new(db: DatabaseConnection, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn table(&self) -> Alias {
        Alias::new(&self.table)
    }

    fn select(&self, cond: Condition) -> SelectStatement {
        Query::select()
            .columns(Ownerships::ALL)
            .from(self.table())
            .cond_where(cond)
            .order_by(Ownerships::CreatedAt, Order::Asc)
            .to_owned()
    }

    fn insert_stmt(&self, records: &[OwnershipRecord]) -> anyhow::Result<InsertStatement> {
        let mut stmt = Query::insert();
        stmt.into_table(self.table()).columns(Ownerships::ALL);
        for record in records {
            let values: Vec<SimpleExpr> = vec![
                record.id.into(),
                record.resource.resource_type().into(),
                record.resource.resource_id().into(),
                record.owner.owner_type().into(),
                record.owner.owner_id().into(),
                record.role.clone().into(),
                encode_permissions(record.permissions.as_ref())?.into(),
                record.created_at.into(),
                record.updated_at.into(),
            ];
            stmt.values(values)?;
        }
        Ok(stmt)
    }

    async fn fetch_all<C: ConnectionTrait>(
        conn: &C,
        stmt: &SelectStatement,
    ) -> anyhow::Result<Vec<OwnershipRecord>> {
        let stmt = conn.get_database_backend().build(stmt);
        OwnershipRow::find_by_statement(stmt)
            .all(conn)
            .await?
            .into_iter()
            .map(OwnershipRow::into_record)
            .collect()
    }

    async fn count_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        resource: &ResourceRef,
    ) -> anyhow::Result<u64> {
        let select = Query::select()
            .expr_as(Expr::col(Ownerships::Id).count(), Alias::new("total"))
            .from(self.table())
            .cond_where(resource_cond(resource))
            .to_owned();
        let stmt = conn.get_database_backend().build(&select);
        let total = CountRow::find_by_statement(stmt)
            .one(conn)
            .await?
            .map_or(0, |row| row.total);
        Ok(u64::try_from(total)?)
    }

    async fn fetch_one<C: ConnectionTrait>(
        &self,
        conn: &C,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> anyhow::Result<Option<OwnershipRecord>> {
        let stmt = conn
            .get_database_backend()
            .build(&self.select(owner_cond(resource, owner)));
        OwnershipRow::find_by_statement(stmt)
            .one(conn)
            .await?
            .map(OwnershipRow::into_record)
            .transpose()
    }
}

#[async_trait]
impl OwnershipRepository for SeaOrmOwnershipRepository {
    async fn find(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> anyhow::Result<Option<OwnershipRecord>> {
        self.fetch_one(&self.db, resource, owner).await
    }

    async fn list(
        &self,
        resource: &ResourceRef,
        filter: &OwnershipFilter,
    ) -> anyhow::Result<Vec<OwnershipRecord>> {
        let mut cond = resource_cond(resource);
        if let Some(owner_type) = &filter.owner_type {
            cond = cond.add(Expr::col(Ownerships::OwnerType).eq(owner_type.as_str()));
        }
        if let Some(role) = &filter.role {
            cond = cond.add(Expr::col(Ownerships::Role).eq(role.as_str()));
        }
        Self::fetch_all(&self.db, &self.select(cond)).await
    }

    async fn count(&self, resource: &ResourceRef) -> anyhow::Result<u64> {
        self.count_in(&self.db, resource).await
    }

    async fn insert(&self, new: NewOwnership) -> anyhow::Result<InsertOutcome> {
        let record = new_record(new, OffsetDateTime::now_utc());
        let stmt = self.insert_stmt(std::slice::from_ref(&record))?;
        match self.db.execute(self.db.get_database_backend().build(&stmt)).await {
            Ok(_) => Ok(InsertOutcome::Inserted(record)),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    /// Counts and inserts in one transaction. SQLite serializes writers, so the
    /// cap is exact there; under `READ COMMITTED` two concurrent transactions
    /// can both see room for one more owner.
    async fn insert_capped(
        &self,
        new: NewOwnership,
        max_owners: usize,
    ) -> anyhow::Result<InsertOutcome> {
        let txn = self.db.begin().await?;

        if self.fetch_one(&txn, &new.resource, &new.owner).await?.is_some() {
            return Ok(InsertOutcome::Conflict);
        }
        let current = self.count_in(&txn, &new.resource).await?;
        if current >= u64::try_from(max_owners)? {
            return Ok(InsertOutcome::LimitReached { current });
        }

        let record = new_record(new, OffsetDateTime::now_utc());
        let stmt = self.insert_stmt(std::slice::from_ref(&record))?;
        match txn.execute(txn.get_database_backend().build(&stmt)).await {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Ok(InsertOutcome::Conflict),
            Err(err) => return Err(err.into()),
        }
        txn.commit().await?;
        Ok(InsertOutcome::Inserted(record))
    }

    async fn update_grant(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
        permissions: Option<Vec<String>>,
    ) -> anyhow::Result<Option<OwnershipRecord>> {
        let stmt = Query::update()
            .table(self.table())
            .values([
                (Ownerships::Role, role.into()),
                (
                    Ownerships::Permissions,
                    encode_permissions(permissions.as_ref())?.into(),
                ),
                (Ownerships::UpdatedAt, OffsetDateTime::now_utc().into()),
            ])
            .cond_where(owner_cond(resource, owner))
            .to_owned();
        let result = self.db.execute(self.db.get_database_backend().build(&stmt)).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(resource, owner).await
    }

    async fn update_role(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
    ) -> anyhow::Result<bool> {
        let stmt = Query::update()
            .table(self.table())
            .values([
                (Ownerships::Role, role.into()),
                (Ownerships::UpdatedAt, OffsetDateTime::now_utc().into()),
            ])
            .cond_where(owner_cond(resource, owner))
            .to_owned();
        let result = self.db.execute(self.db.get_database_backend().build(&stmt)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reassign(
        &self,
        resource: &ResourceRef,
        from: &OwnerRef,
        to: &OwnerRef,
    ) -> anyhow::Result<ReassignOutcome> {
        let txn = self.db.begin().await?;

        if self.fetch_one(&txn, resource, from).await?.is_none() {
            return Ok(ReassignOutcome::Missing);
        }
        if from != to && self.fetch_one(&txn, resource, to).await?.is_some() {
            return Ok(ReassignOutcome::Conflict);
        }

        let stmt = Query::update()
            .table(self.table())
            .values([
                (Ownerships::OwnerType, to.owner_type().into()),
                (Ownerships::OwnerId, to.owner_id().into()),
                (Ownerships::UpdatedAt, OffsetDateTime::now_utc().into()),
            ])
            .cond_where(owner_cond(resource, from))
            .to_owned();
        match txn.execute(txn.get_database_backend().build(&stmt)).await {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Ok(ReassignOutcome::Conflict),
            Err(err) => return Err(err.into()),
        }

        let moved = self
            .fetch_one(&txn, resource, to)
            .await?
            .context("reassigned ownership record not found")?;
        txn.commit().await?;
        Ok(ReassignOutcome::Moved(moved))
    }

    async fn delete(&self, resource: &ResourceRef, owner: &OwnerRef) -> anyhow::Result<bool> {
        let stmt = Query::delete()
            .from_table(self.table())
            .cond_where(owner_cond(resource, owner))
            .to_owned();
        let result = self.db.execute(self.db.get_database_backend().build(&stmt)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, resource: &ResourceRef) -> anyhow::Result<u64> {
        let stmt = Query::delete()
            .from_table(self.table())
            .cond_where(resource_cond(resource))
            .to_owned();
        let result = self.db.execute(self.db.get_database_backend().build(&stmt)).await?;
        Ok(result.rows_affected())
    }

    async fn replace_all(
        &self,
        resource: &ResourceRef,
        owners: Vec<NewOwnership>,
    ) -> anyhow::Result<Vec<OwnershipRecord>> {
        let mut seen = HashSet::with_capacity(owners.len());
        for new in &owners {
            anyhow::ensure!(
                &new.resource == resource,
                "replacement owner belongs to {} instead of {resource}",
                new.resource
            );
            anyhow::ensure!(
                seen.insert(&new.owner),
                "duplicate owner {} in replacement set",
                new.owner
            );
        }

        let now = OffsetDateTime::now_utc();
        let records: Vec<OwnershipRecord> =
            owners.into_iter().map(|new| new_record(new, now)).collect();

        let txn = self.db.begin().await?;
        let wipe = Query::delete()
            .from_table(self.table())
            .cond_where(resource_cond(resource))
            .to_owned();
        txn.execute(txn.get_database_backend().build(&wipe)).await?;
        if !records.is_empty() {
            let insert = self.insert_stmt(&records)?;
            txn.execute(txn.get_database_backend().build(&insert)).await?;
        }
        txn.commit().await?;

        Ok(records)
    }
}
