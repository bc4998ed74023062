//! In-memory storage, used by tests and by hosts without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use ownership_sdk::OwnershipRecord;
use ownership_security::{OwnerRef, ResourceRef};
use parking_lot::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::repo::{
    InsertOutcome, NewOwnership, OwnershipFilter, OwnershipRepository, ReassignOutcome,
    ResourceStore,
};

/// In-memory ownership table.
///
/// A single lock guards all records, so every operation (including
/// `replace_all`) is atomic.
#[derive(Debug, Default)]
pub struct InMemoryOwnershipRepository {
    records: Mutex<Vec<OwnershipRecord>>,
}

impl InMemoryOwnershipRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn position(
        records: &[OwnershipRecord],
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> Option<usize> {
        records
            .iter()
            .position(|r| &r.resource == resource && &r.owner == owner)
    }

    fn insert_locked(&self, new: NewOwnership, max_owners: Option<usize>) -> InsertOutcome {
        let mut records = self.records.lock();
        if Self::position(&records, &new.resource, &new.owner).is_some() {
            return InsertOutcome::Conflict;
        }
        if let Some(max) = max_owners {
            let current = records.iter().filter(|r| r.resource == new.resource).count();
            if current >= max {
                return InsertOutcome::LimitReached {
                    current: current as u64,
                };
            }
        }
        let record = Self::to_record(new, OffsetDateTime::now_utc());
        records.push(record.clone());
        InsertOutcome::Inserted(record)
    }

    fn to_record(new: NewOwnership, now: OffsetDateTime) -> OwnershipRecord {
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
}

#[async_trait]
impl OwnershipRepository for InMemoryOwnershipRepository {
    async fn find(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> anyhow::Result<Option<OwnershipRecord>> {
        let records = self.records.lock();
        Ok(Self::position(&records, resource, owner).map(|i| records[i].clone()))
    }

    async fn list(
        &self,
        resource: &ResourceRef,
        filter: &OwnershipFilter,
    ) -> anyhow::Result<Vec<OwnershipRecord>> {
        let records = self.records.lock();
        Ok(records
            .iter()
            .filter(|r| &r.resource == resource)
            .filter(|r| {
                filter
                    .owner_type
                    .as_deref()
                    .is_none_or(|t| r.owner.owner_type() == t)
            })
            .filter(|r| filter.role.as_deref().is_none_or(|role| r.role() == Some(role)))
            .cloned()
            .collect())
    }

    async fn count(&self, resource: &ResourceRef) -> anyhow::Result<u64> {
        let records = self.records.lock();
        Ok(records.iter().filter(|r| &r.resource == resource).count() as u64)
    }

    async fn insert(&self, new: NewOwnership) -> anyhow::Result<InsertOutcome> {
        Ok(self.insert_locked(new, None))
    }

    async fn insert_capped(
        &self,
        new: NewOwnership,
        max_owners: usize,
    ) -> anyhow::Result<InsertOutcome> {
        Ok(self.insert_locked(new, Some(max_owners)))
    }

    async fn update_grant(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
        permissions: Option<Vec<String>>,
    ) -> anyhow::Result<Option<OwnershipRecord>> {
        let mut records = self.records.lock();
        let Some(i) = Self::position(&records, resource, owner) else {
            return Ok(None);
        };
        let record = &mut records[i];
        record.role = Some(role.to_owned());
        record.permissions = permissions;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Some(record.clone()))
    }

    async fn update_role(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
    ) -> anyhow::Result<bool> {
        let mut records = self.records.lock();
        let Some(i) = Self::position(&records, resource, owner) else {
            return Ok(false);
        };
        records[i].role = Some(role.to_owned());
        records[i].updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn reassign(
        &self,
        resource: &ResourceRef,
        from: &OwnerRef,
        to: &OwnerRef,
    ) -> anyhow::Result<ReassignOutcome> {
        let mut records = self.records.lock();
        let Some(i) = Self::position(&records, resource, from) else {
            return Ok(ReassignOutcome::Missing);
        };
        if from != to && Self::position(&records, resource, to).is_some() {
            return Ok(ReassignOutcome::Conflict);
        }
        let record = &mut records[i];
        record.owner = to.clone();
        record.updated_at = OffsetDateTime::now_utc();
        Ok(ReassignOutcome::Moved(record.clone()))
    }

    async fn delete(&self, resource: &ResourceRef, owner: &OwnerRef) -> anyhow::Result<bool> {
        let mut records = self.records.lock();
        Ok(match Self::position(&records, resource, owner) {
            Some(i) => {
                records.remove(i);
                true
            }
            None => false,
        })
    }

    async fn delete_all(&self, resource: &ResourceRef) -> anyhow::Result<u64> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| &r.resource != resource);
        Ok((before - records.len()) as u64)
    }

    async fn replace_all(
        &self,
        resource: &ResourceRef,
        owners: Vec<NewOwnership>,
    ) -> anyhow::Result<Vec<OwnershipRecord>> {
        let mut records = self.records.lock();
        let mut fresh: Vec<OwnershipRecord> = Vec::with_capacity(owners.len());
        let now = OffsetDateTime::now_utc();
        for new in owners {
            anyhow::ensure!(
                &new.resource == resource,
                "replacement owner belongs to {} instead of {resource}",
                new.resource
            );
            anyhow::ensure!(
                Self::position(&fresh, resource, &new.owner).is_none(),
                "duplicate owner {} in replacement set",
                new.owner
            );
            fresh.push(Self::to_record(new, now));
        }
        records.retain(|r| &r.resource != resource);
        records.extend(fresh.iter().cloned());
        Ok(fresh)
    }
}

/// In-memory home of the inline `{morph}_type` / `{morph}_id` columns.
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    owners: Mutex<HashMap<ResourceRef, Option<OwnerRef>>>,
}

impl InMemoryResourceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last persisted owner of `resource`; `None` when never saved or cleared.
    #[must_use]
    pub fn owner_of(&self, resource: &ResourceRef) -> Option<OwnerRef> {
        self.owners.lock().get(resource).cloned().flatten()
    }

    /// Number of resources whose owner columns were ever saved.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.owners.lock().len()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn save_owner(
        &self,
        resource: &ResourceRef,
        owner: Option<&OwnerRef>,
    ) -> anyhow::Result<bool> {
        self.owners.lock().insert(resource.clone(), owner.cloned());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new(resource: &ResourceRef, owner: &OwnerRef, role: &str) -> NewOwnership {
        NewOwnership {
            resource: resource.clone(),
            owner: owner.clone(),
            role: role.to_owned(),
            permissions: None,
        }
    }

    #[tokio::test]
    async fn test_insert_reports_conflict() {
        let repo = InMemoryOwnershipRepository::new();
        let post = ResourceRef::new("post", 1);
        let alice = OwnerRef::new("user", 1);

        let first = repo.insert(new(&post, &alice, "owner")).await.unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let second = repo.insert(new(&post, &alice, "viewer")).await.unwrap();
        assert_eq!(second, InsertOutcome::Conflict);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_capped_insert_stops_at_limit() {
        let repo = InMemoryOwnershipRepository::new();
        let post = ResourceRef::new("post", 1);
        let alice = OwnerRef::new("user", 1);

        let first = repo.insert_capped(new(&post, &alice, "owner"), 1).await.unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));
        // An existing pair is a conflict, not a new owner.
        assert_eq!(
            repo.insert_capped(new(&post, &alice, "viewer"), 1).await.unwrap(),
            InsertOutcome::Conflict
        );
        assert_eq!(
            repo.insert_capped(new(&post, &OwnerRef::new("user", 2), "viewer"), 1)
                .await
                .unwrap(),
            InsertOutcome::LimitReached { current: 1 }
        );
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = InMemoryOwnershipRepository::new();
        let post = ResourceRef::new("post", 1);
        repo.insert(new(&post, &OwnerRef::new("user", 1), "owner")).await.unwrap();
        repo.insert(new(&post, &OwnerRef::new("team", 1), "viewer")).await.unwrap();
        repo.insert(new(&ResourceRef::new("post", 2), &OwnerRef::new("user", 1), "owner"))
            .await
            .unwrap();

        let all = repo.list(&post, &OwnershipFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let teams = repo.list(&post, &OwnershipFilter::owner_type("team")).await.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].owner, OwnerRef::new("team", 1));

        let owners = repo.list(&post, &OwnershipFilter::role("owner")).await.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(repo.count(&post).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reassign_outcomes() {
        let repo = InMemoryOwnershipRepository::new();
        let post = ResourceRef::new("post", 1);
        let alice = OwnerRef::new("user", 1);
        let bob = OwnerRef::new("user", 2);
        let carol = OwnerRef::new("user", 3);
        repo.insert(new(&post, &alice, "editor")).await.unwrap();
        repo.insert(new(&post, &carol, "viewer")).await.unwrap();

        assert_eq!(
            repo.reassign(&post, &bob, &alice).await.unwrap(),
            ReassignOutcome::Missing
        );
        assert_eq!(
            repo.reassign(&post, &alice, &carol).await.unwrap(),
            ReassignOutcome::Conflict
        );

        let ReassignOutcome::Moved(record) = repo.reassign(&post, &alice, &bob).await.unwrap() else {
            panic!("expected record to move");
        };
        assert_eq!(record.owner, bob);
        assert_eq!(record.role(), Some("editor"));
        assert!(repo.find(&post, &alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_all_rejects_duplicates_atomically() {
        let repo = InMemoryOwnershipRepository::new();
        let post = ResourceRef::new("post", 1);
        let alice = OwnerRef::new("user", 1);
        repo.insert(new(&post, &alice, "owner")).await.unwrap();

        let bob = OwnerRef::new("user", 2);
        let result = repo
            .replace_all(&post, vec![new(&post, &bob, "viewer"), new(&post, &bob, "viewer")])
            .await;
        assert!(result.is_err());
        assert!(repo.find(&post, &alice).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resource_store_keeps_last_owner() {
        let store = InMemoryResourceStore::new();
        let post = ResourceRef::new("post", 1);
        let alice = OwnerRef::new("user", 1);

        assert!(store.save_owner(&post, Some(&alice)).await.unwrap());
        assert_eq!(store.owner_of(&post), Some(alice));

        store.save_owner(&post, None).await.unwrap();
        assert_eq!(store.owner_of(&post), None);
        assert_eq!(store.tracked(), 1);
    }
}
