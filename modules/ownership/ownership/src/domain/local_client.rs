use async_trait::async_trait;
use ownership_sdk::{Ownable, OwnershipClient, OwnershipError, OwnershipRecord};
use ownership_security::{ActorContext, OwnerRef, ResourceRef};

use crate::domain::error::DomainError;
use crate::domain::service::{AddOwnerOptions, OwnershipService};

/// In-process `OwnershipClient` backed by [`OwnershipService`].
pub struct LocalClient {
    service: OwnershipService,
}

impl LocalClient {
    #[must_use]
    pub fn new(service: OwnershipService) -> Self {
        Self { service }
    }
}

fn log_and_convert(operation: &'static str, e: DomainError) -> OwnershipError {
    if let DomainError::Internal(inner) = &e {
        tracing::error!(operation, error = ?inner, "ownership storage failure");
    }
    e.into()
}

fn options(role: Option<&str>, permissions: Option<Vec<String>>) -> AddOwnerOptions {
    AddOwnerOptions {
        role: role.map(ToOwned::to_owned),
        permissions,
        notify_update: false,
    }
}

#[async_trait]
impl OwnershipClient for LocalClient {
    async fn is_owned_by(
        &self,
        ctx: &ActorContext,
        resource: &dyn Ownable,
        candidate: Option<&OwnerRef>,
    ) -> Result<bool, OwnershipError> {
        self.service
            .is_owned_by(ctx, resource, candidate)
            .await
            .map_err(|e| log_and_convert("is_owned_by", e))
    }

    async fn has_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> Result<bool, OwnershipError> {
        self.service
            .has_owner(resource, owner)
            .await
            .map_err(|e| log_and_convert("has_owner", e))
    }

    async fn owner_has_permission(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        permission: &str,
    ) -> Result<bool, OwnershipError> {
        self.service
            .owner_has_permission(resource, owner, permission)
            .await
            .map_err(|e| log_and_convert("owner_has_permission", e))
    }

    async fn get_owners(
        &self,
        resource: &ResourceRef,
        owner_type: Option<&str>,
    ) -> Result<Vec<OwnershipRecord>, OwnershipError> {
        self.service
            .get_owners(resource, owner_type)
            .await
            .map_err(|e| log_and_convert("get_owners", e))
    }

    async fn add_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: Option<&str>,
        permissions: Option<Vec<String>>,
    ) -> Result<OwnershipRecord, OwnershipError> {
        self.service
            .add_owner(resource, owner, options(role, permissions))
            .await
            .map_err(|e| log_and_convert("add_owner", e))
    }

    async fn remove_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> Result<bool, OwnershipError> {
        self.service
            .remove_owner(resource, owner)
            .await
            .map_err(|e| log_and_convert("remove_owner", e))
    }

    async fn transfer_ownership(
        &self,
        resource: &ResourceRef,
        from: &OwnerRef,
        to: &OwnerRef,
    ) -> Result<bool, OwnershipError> {
        self.service
            .transfer_record(resource, from, to)
            .await
            .map_err(|e| log_and_convert("transfer_ownership", e))
    }

    async fn sync_owners(
        &self,
        resource: &ResourceRef,
        owners: &[OwnerRef],
        role: Option<&str>,
        permissions: Option<Vec<String>>,
    ) -> Result<Vec<OwnershipRecord>, OwnershipError> {
        self.service
            .sync_owners(resource, owners, options(role, permissions))
            .await
            .map_err(|e| log_and_convert("sync_owners", e))
    }

    async fn update_owner_role(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
    ) -> Result<bool, OwnershipError> {
        self.service
            .update_owner_role(resource, owner, role)
            .await
            .map_err(|e| log_and_convert("update_owner_role", e))
    }
}
