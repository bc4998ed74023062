//! Storage ports used by the ownership service.

use async_trait::async_trait;
use ownership_sdk::OwnershipRecord;
use ownership_security::{OwnerRef, ResourceRef};

/// A record to insert into the ownership table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOwnership {
    pub resource: ResourceRef,
    pub owner: OwnerRef,
    pub role: String,
    pub permissions: Option<Vec<String>>,
}

/// Result of an insert that may hit the (resource, owner) unique constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(OwnershipRecord),
    /// The pair already exists; nothing was written.
    Conflict,
    /// The resource already has `current` records, at or above the cap.
    LimitReached { current: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassignOutcome {
    Moved(OwnershipRecord),
    /// The source owner has no record.
    Missing,
    /// The target owner already has a record of its own.
    Conflict,
}

/// Optional filters for [`OwnershipRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct OwnershipFilter {
    pub owner_type: Option<String>,
    pub role: Option<String>,
}

impl OwnershipFilter {
    #[must_use]
    pub fn owner_type(owner_type: impl Into<String>) -> Self {
        Self {
            owner_type: Some(owner_type.into()),
            role: None,
        }
    }

    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            owner_type: None,
            role: Some(role.into()),
        }
    }
}

/// Repository trait for the ownership table (multiple mode).
///
/// Implementations enforce one record per (resource, owner) in storage and
/// report a violation as [`InsertOutcome::Conflict`] rather than an error.
#[async_trait]
pub trait OwnershipRepository: Send + Sync {
    async fn find(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> anyhow::Result<Option<OwnershipRecord>>;

    /// Records of `resource` in insertion order.
    async fn list(
        &self,
        resource: &ResourceRef,
        filter: &OwnershipFilter,
    ) -> anyhow::Result<Vec<OwnershipRecord>>;

    async fn count(&self, resource: &ResourceRef) -> anyhow::Result<u64>;

    async fn insert(&self, new: NewOwnership) -> anyhow::Result<InsertOutcome>;

    /// Like `insert`, refusing a new pair once the resource has `max_owners` records.
    ///
    /// Counting and inserting form one unit of work. How strictly concurrent
    /// callers are held to the cap depends on the store's isolation.
    async fn insert_capped(
        &self,
        new: NewOwnership,
        max_owners: usize,
    ) -> anyhow::Result<InsertOutcome>;

    /// Overwrite role and overrides of an existing record.
    ///
    /// Returns `None` when the pair has no record.
    async fn update_grant(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
        permissions: Option<Vec<String>>,
    ) -> anyhow::Result<Option<OwnershipRecord>>;

    /// Returns whether a record was updated.
    async fn update_role(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
    ) -> anyhow::Result<bool>;

    /// Point `from`'s record at `to`, keeping role and overrides.
    async fn reassign(
        &self,
        resource: &ResourceRef,
        from: &OwnerRef,
        to: &OwnerRef,
    ) -> anyhow::Result<ReassignOutcome>;

    /// Returns whether a record was deleted.
    async fn delete(&self, resource: &ResourceRef, owner: &OwnerRef) -> anyhow::Result<bool>;

    /// Returns the number of deleted records.
    async fn delete_all(&self, resource: &ResourceRef) -> anyhow::Result<u64>;

    /// Atomically delete every record of `resource` and insert `owners`.
    async fn replace_all(
        &self,
        resource: &ResourceRef,
        owners: Vec<NewOwnership>,
    ) -> anyhow::Result<Vec<OwnershipRecord>>;
}

/// Persists the inline owner columns of single-mode resources.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Write `{morph}_type` / `{morph}_id` of `resource` (both cleared for `None`).
    ///
    /// Returns whether a row was written.
    async fn save_owner(
        &self,
        resource: &ResourceRef,
        owner: Option<&OwnerRef>,
    ) -> anyhow::Result<bool>;
}
