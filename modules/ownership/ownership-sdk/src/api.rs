//! Public API trait for the ownership module.
//!
//! Hosts obtain an implementation from the module (see `ownership::LocalClient`)
//! and call it from their data layer or request handlers.

use async_trait::async_trait;
use ownership_security::{ActorContext, OwnerRef, ResourceRef};

use crate::error::OwnershipError;
use crate::models::{Ownable, OwnershipRecord};

/// Public API trait for ownership checks and multiple-mode owner management.
///
/// ```ignore
/// // Does the current actor own the post?
/// let mine = client.is_owned_by(&ctx, &post, None).await?;
///
/// // Share it with an editor and check what they may do.
/// client.add_owner(&post.reference, &bob, Some("editor"), None).await?;
/// let can_delete = client.owner_has_permission(&post.reference, &bob, "delete").await?;
/// ```
#[async_trait]
pub trait OwnershipClient: Send + Sync {
    /// Whether `candidate` (or the current actor when `None`) owns `resource`.
    ///
    /// Returns `false` when there is no candidate and no current actor.
    ///
    /// # Errors
    ///
    /// - `Internal` on storage failure
    async fn is_owned_by(
        &self,
        ctx: &ActorContext,
        resource: &dyn Ownable,
        candidate: Option<&OwnerRef>,
    ) -> Result<bool, OwnershipError>;

    /// Whether an ownership record exists for the exact (resource, owner) pair.
    ///
    /// # Errors
    ///
    /// - `Internal` on storage failure
    async fn has_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> Result<bool, OwnershipError>;

    /// Role and override based permission check.
    ///
    /// # Errors
    ///
    /// - `Internal` on storage failure
    async fn owner_has_permission(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        permission: &str,
    ) -> Result<bool, OwnershipError>;

    /// Owners of `resource`, optionally restricted to one owner type.
    ///
    /// # Errors
    ///
    /// - `InvalidOwner` in single mode
    /// - `Internal` on storage failure
    async fn get_owners(
        &self,
        resource: &ResourceRef,
        owner_type: Option<&str>,
    ) -> Result<Vec<OwnershipRecord>, OwnershipError>;

    /// Add `owner` or overwrite its role and overrides when it is already an owner.
    ///
    /// # Errors
    ///
    /// - `InvalidOwner` for an unknown role or in single mode
    /// - `OwnerLimitReached` when the resource is full
    async fn add_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: Option<&str>,
        permissions: Option<Vec<String>>,
    ) -> Result<OwnershipRecord, OwnershipError>;

    /// Detach `owner`. Returns whether a record was deleted.
    ///
    /// # Errors
    ///
    /// - `InvalidOwner` in single mode
    async fn remove_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> Result<bool, OwnershipError>;

    /// Move `from`'s record to `to`, keeping role and overrides.
    ///
    /// Returns `false` when `from` is not an owner.
    ///
    /// # Errors
    ///
    /// - `InvalidOwner` when `to` already owns the resource or in single mode
    async fn transfer_ownership(
        &self,
        resource: &ResourceRef,
        from: &OwnerRef,
        to: &OwnerRef,
    ) -> Result<bool, OwnershipError>;

    /// Replace every owner of `resource` with `owners`.
    ///
    /// # Errors
    ///
    /// - `InvalidOwner` for an unknown role or in single mode
    /// - `OwnerLimitReached` when `owners` exceeds the configured maximum
    async fn sync_owners(
        &self,
        resource: &ResourceRef,
        owners: &[OwnerRef],
        role: Option<&str>,
        permissions: Option<Vec<String>>,
    ) -> Result<Vec<OwnershipRecord>, OwnershipError>;

    /// Change the role of an existing owner. Returns whether a record changed.
    ///
    /// # Errors
    ///
    /// - `InvalidOwner` for an unknown role or in single mode
    async fn update_owner_role(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
    ) -> Result<bool, OwnershipError>;
}
