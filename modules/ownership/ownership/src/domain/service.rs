use std::collections::HashSet;
use std::sync::Arc;

use ownership_sdk::{Ownable, OwnershipDelta, OwnershipEvent, OwnershipMode, OwnershipRecord};
use ownership_security::{ActorContext, BypassPolicyRef, OwnerRef, ResourceRef};
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, EventsConfig, OwnershipConfig};
use crate::domain::cache::DecisionCache;
use crate::domain::engine::{DecisionEngine, OwnedByScope, ScopeSettings};
use crate::domain::error::DomainError;
use crate::domain::ports::EventPublisher;
use crate::domain::registry::RoleRegistry;
use crate::domain::repo::{
    InsertOutcome, NewOwnership, OwnershipFilter, OwnershipRepository, ReassignOutcome,
    ResourceStore,
};

/// Options of `add_owner`, `add_owners` and `sync_owners`.
#[derive(Debug, Clone, Default)]
pub struct AddOwnerOptions {
    /// Defaults to the configured default role.
    pub role: Option<String>,
    pub permissions: Option<Vec<String>>,
    /// Emit `OwnershipUpdated` when the owner already existed and was updated in place.
    pub notify_update: bool,
}

impl AddOwnerOptions {
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn notify_update(mut self) -> Self {
        self.notify_update = true;
        self
    }
}

#[derive(Debug, Clone)]
struct MutationSettings {
    events: EventsConfig,
    max_owners: Option<usize>,
    auto_assign_creator: bool,
}

/// Ownership service: decision checks plus the mutation protocol.
#[derive(Clone)]
pub struct OwnershipService {
    engine: DecisionEngine,
    repo: Arc<dyn OwnershipRepository>,
    resources: Arc<dyn ResourceStore>,
    events: Arc<dyn EventPublisher<OwnershipEvent>>,
    registry: Arc<RoleRegistry>,
    cache: Arc<DecisionCache>,
    settings: Arc<MutationSettings>,
    quiet: bool,
}

impl OwnershipService {
    /// Create a service from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` reported by [`OwnershipConfig::validate`].
    pub fn new(
        config: &OwnershipConfig,
        repo: Arc<dyn OwnershipRepository>,
        resources: Arc<dyn ResourceStore>,
        events: Arc<dyn EventPublisher<OwnershipEvent>>,
        bypass: BypassPolicyRef,
    ) -> Result<Self, ConfigError> {
        let mode = config.validate()?;
        let multiple = &config.multiple_ownership;

        let registry = Arc::new(RoleRegistry::from_config(multiple));
        let cache = Arc::new(DecisionCache::new(&config.cache));
        let engine = DecisionEngine::new(
            mode,
            ScopeSettings {
                apply_global_scope: config.apply_global_scope,
                scope_in_console: config.scope_in_console,
            },
            Arc::clone(&repo),
            Arc::clone(&registry),
            Arc::clone(&cache),
            bypass,
        );

        info!(
            mode = %mode,
            roles = registry.roles().count(),
            cache = cache.is_enabled(),
            "ownership service initialized"
        );

        Ok(Self {
            engine,
            repo,
            resources,
            events,
            registry,
            cache,
            settings: Arc::new(MutationSettings {
                events: config.events,
                max_owners: multiple.validation.max_owners,
                auto_assign_creator: multiple.auto_assign_creator,
            }),
            quiet: false,
        })
    }

    /// Same as [`OwnershipService::new`] with the bypass allow-list from the configuration.
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` reported by [`OwnershipConfig::validate`].
    pub fn from_config(
        config: &OwnershipConfig,
        repo: Arc<dyn OwnershipRepository>,
        resources: Arc<dyn ResourceStore>,
        events: Arc<dyn EventPublisher<OwnershipEvent>>,
    ) -> Result<Self, ConfigError> {
        let bypass = config.bypass.to_policy()?;
        Self::new(config, repo, resources, events, Arc::new(bypass))
    }

    /// A handle whose mutations publish no events.
    #[must_use]
    pub fn quietly(&self) -> Self {
        Self {
            quiet: true,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    #[must_use]
    pub fn mode(&self) -> OwnershipMode {
        self.engine.mode()
    }

    #[must_use]
    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    fn emit(&self, event: OwnershipEvent) {
        if self.quiet || !self.settings.events.enabled(event.kind()) {
            debug!(event = event.name(), "event suppressed");
            return;
        }
        self.events.publish(&event);
    }

    fn require_mode(
        &self,
        operation: &'static str,
        required: OwnershipMode,
    ) -> Result<(), DomainError> {
        if self.mode() == required {
            Ok(())
        } else {
            warn!(operation, mode = %self.mode(), "operation rejected in this ownership mode");
            Err(DomainError::wrong_mode(operation, required))
        }
    }

    fn check_owner(owner: &OwnerRef) -> Result<(), DomainError> {
        if owner.is_valid() {
            Ok(())
        } else {
            warn!(owner = %owner, "unusable owner reference");
            Err(DomainError::invalid_owner(format!(
                "owner reference '{owner}' needs a type and an id"
            )))
        }
    }

    fn resolve_role(&self, role: Option<&str>) -> Result<String, DomainError> {
        let role = role.unwrap_or_else(|| self.registry.default_role());
        if self.registry.is_valid_role(role) {
            Ok(role.to_owned())
        } else {
            warn!(role, "unknown role rejected");
            Err(DomainError::invalid_role(role))
        }
    }

    // --- checks ---------------------------------------------------------

    /// # Errors
    ///
    /// Storage failures in multiple mode.
    pub async fn is_owned_by(
        &self,
        ctx: &ActorContext,
        resource: &dyn Ownable,
        candidate: Option<&OwnerRef>,
    ) -> Result<bool, DomainError> {
        self.engine.is_owned_by(ctx, resource, candidate).await
    }

    /// # Errors
    ///
    /// Storage failures. Always `false` in single mode.
    pub async fn has_owner(&self, resource: &ResourceRef, owner: &OwnerRef) -> Result<bool, DomainError> {
        self.engine.has_owner(resource, owner).await
    }

    /// # Errors
    ///
    /// Storage failures. Always `false` in single mode.
    pub async fn owner_has_permission(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        permission: &str,
    ) -> Result<bool, DomainError> {
        self.engine.owner_has_permission(resource, owner, permission).await
    }

    /// # Errors
    ///
    /// Storage failures. Always `false` in single mode.
    pub async fn has_owner_with_role(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
    ) -> Result<bool, DomainError> {
        self.engine.has_owner_with_role(resource, owner, role).await
    }

    #[must_use]
    pub fn should_scope(&self, ctx: &ActorContext) -> bool {
        self.engine.should_scope(ctx)
    }

    #[must_use]
    pub fn owned_by(&self, ctx: &ActorContext, owner: Option<&OwnerRef>) -> OwnedByScope {
        self.engine.owned_by(ctx, owner)
    }

    #[must_use]
    pub fn global_scope(&self, ctx: &ActorContext) -> OwnedByScope {
        self.engine.global_scope(ctx)
    }

    // --- queries --------------------------------------------------------

    /// # Errors
    ///
    /// `WrongMode` outside single mode.
    pub fn get_owner(&self, resource: &dyn Ownable) -> Result<Option<OwnerRef>, DomainError> {
        self.require_mode("get_owner", OwnershipMode::Single)?;
        Ok(resource.owner_ref())
    }

    /// # Errors
    ///
    /// `WrongMode` in single mode; storage failures.
    pub async fn get_owners(
        &self,
        resource: &ResourceRef,
        owner_type: Option<&str>,
    ) -> Result<Vec<OwnershipRecord>, DomainError> {
        self.require_mode("get_owners", OwnershipMode::Multiple)?;
        let filter = OwnershipFilter {
            owner_type: owner_type.map(ToOwned::to_owned),
            role: None,
        };
        Ok(self.repo.list(resource, &filter).await?)
    }

    /// # Errors
    ///
    /// `WrongMode` in single mode; storage failures.
    pub async fn owners_with_role(
        &self,
        resource: &ResourceRef,
        role: &str,
    ) -> Result<Vec<OwnershipRecord>, DomainError> {
        self.require_mode("owners_with_role", OwnershipMode::Multiple)?;
        Ok(self.repo.list(resource, &OwnershipFilter::role(role)).await?)
    }

    /// # Errors
    ///
    /// `WrongMode` in single mode; storage failures.
    pub async fn ownership_record(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> Result<Option<OwnershipRecord>, DomainError> {
        self.require_mode("ownership_record", OwnershipMode::Multiple)?;
        Ok(self.repo.find(resource, owner).await?)
    }

    /// One or zero in single mode, the number of records in multiple mode.
    ///
    /// # Errors
    ///
    /// Storage failures in multiple mode.
    pub async fn owners_count(&self, resource: &dyn Ownable) -> Result<u64, DomainError> {
        match self.mode() {
            OwnershipMode::Single => Ok(u64::from(resource.owner_ref().is_some())),
            OwnershipMode::Multiple => Ok(self.repo.count(&resource.resource_ref()).await?),
        }
    }

    // --- single mode ----------------------------------------------------

    /// Point the inline owner columns at `owner` and persist them.
    ///
    /// # Errors
    ///
    /// `WrongMode` outside single mode, `InvalidOwner`, storage failures.
    #[instrument(skip(self, resource), fields(resource = %resource.resource_ref(), owner = %owner))]
    pub async fn set_owner(
        &self,
        resource: &mut dyn Ownable,
        owner: &OwnerRef,
    ) -> Result<bool, DomainError> {
        self.require_mode("set_owner", OwnershipMode::Single)?;
        Self::check_owner(owner)?;

        let reference = resource.resource_ref();
        let saved = self.resources.save_owner(&reference, Some(owner)).await?;
        if saved {
            resource.set_owner_ref(Some(owner.clone()));
            info!("owner set");
            self.emit(OwnershipEvent::Updated {
                resource: reference,
                delta: OwnershipDelta::owner(owner.clone()),
            });
        }
        Ok(saved)
    }

    /// Clear the inline owner columns and persist them.
    ///
    /// # Errors
    ///
    /// `WrongMode` outside single mode, storage failures.
    #[instrument(skip(self, resource), fields(resource = %resource.resource_ref()))]
    pub async fn clear_owner(&self, resource: &mut dyn Ownable) -> Result<bool, DomainError> {
        self.require_mode("clear_owner", OwnershipMode::Single)?;

        let reference = resource.resource_ref();
        let previous = resource.owner_ref();
        let saved = self.resources.save_owner(&reference, None).await?;
        if saved {
            resource.set_owner_ref(None);
            info!(previous = ?previous, "owner cleared");
            self.emit(OwnershipEvent::Deleted {
                resource: reference,
                removed: previous,
            });
        }
        Ok(saved)
    }

    // --- multiple mode --------------------------------------------------

    /// Add `owner`, or overwrite its role and overrides when it already owns `resource`.
    ///
    /// # Errors
    ///
    /// `WrongMode` in single mode, `InvalidRole`, `InvalidOwner`,
    /// `OwnerLimitReached`, storage failures.
    #[instrument(skip(self, options), fields(resource = %resource, owner = %owner, role = ?options.role))]
    pub async fn add_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        options: AddOwnerOptions,
    ) -> Result<OwnershipRecord, DomainError> {
        self.require_mode("add_owner", OwnershipMode::Multiple)?;
        Self::check_owner(owner)?;
        let role = self.resolve_role(options.role.as_deref())?;

        if self.repo.find(resource, owner).await?.is_some() {
            return self.regrant(resource, owner, &role, options).await;
        }

        let new = NewOwnership {
            resource: resource.clone(),
            owner: owner.clone(),
            role: role.clone(),
            permissions: options.permissions.clone(),
        };
        let outcome = match self.settings.max_owners {
            Some(max) => self.repo.insert_capped(new, max).await?,
            None => self.repo.insert(new).await?,
        };
        match outcome {
            InsertOutcome::Inserted(record) => {
                self.cache.invalidate(resource);
                info!(record_id = %record.id, "owner added");
                self.emit(OwnershipEvent::Created {
                    resource: resource.clone(),
                    record: record.clone(),
                });
                Ok(record)
            }
            InsertOutcome::Conflict => {
                debug!("concurrent insert won, updating in place");
                self.regrant(resource, owner, &role, options).await
            }
            InsertOutcome::LimitReached { current } => {
                let max = self.settings.max_owners.unwrap_or_default();
                warn!(current, max, "owner limit reached");
                Err(DomainError::OwnerLimitReached {
                    resource: resource.clone(),
                    max,
                })
            }
        }
    }

    async fn regrant(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
        options: AddOwnerOptions,
    ) -> Result<OwnershipRecord, DomainError> {
        let record = self
            .repo
            .update_grant(resource, owner, role, options.permissions.clone())
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("ownership record of {owner} on {resource} vanished during update")
            })?;
        self.cache.invalidate(resource);
        info!(record_id = %record.id, "owner updated in place");

        if options.notify_update {
            self.emit(OwnershipEvent::Updated {
                resource: resource.clone(),
                delta: OwnershipDelta::owner(owner.clone())
                    .with_role(role)
                    .with_permissions(options.permissions),
            });
        }
        Ok(record)
    }

    /// `add_owner` for each owner in order; stops at the first failure.
    ///
    /// # Errors
    ///
    /// The first error returned by `add_owner`.
    pub async fn add_owners(
        &self,
        resource: &ResourceRef,
        owners: &[OwnerRef],
        options: &AddOwnerOptions,
    ) -> Result<Vec<OwnershipRecord>, DomainError> {
        let mut added = Vec::with_capacity(owners.len());
        for owner in owners {
            added.push(self.add_owner(resource, owner, options.clone()).await?);
        }
        Ok(added)
    }

    /// # Errors
    ///
    /// `WrongMode` in single mode, storage failures.
    #[instrument(skip(self), fields(resource = %resource, owner = %owner))]
    pub async fn remove_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> Result<bool, DomainError> {
        self.require_mode("remove_owner", OwnershipMode::Multiple)?;

        let deleted = self.repo.delete(resource, owner).await?;
        if deleted {
            self.cache.invalidate(resource);
            info!("owner removed");
            self.emit(OwnershipEvent::Deleted {
                resource: resource.clone(),
                removed: Some(owner.clone()),
            });
        } else {
            debug!("nothing to remove");
        }
        Ok(deleted)
    }

    /// Hand ownership from `from` to `to`.
    ///
    /// Single mode sets `to` as the owner. Multiple mode moves `from`'s record to
    /// `to`, keeping role and overrides, and returns `false` when `from` has no
    /// record.
    ///
    /// # Errors
    ///
    /// `InvalidOwner` for an unusable target or one that already owns the
    /// resource, storage failures.
    #[instrument(skip(self, resource), fields(resource = %resource.resource_ref(), from = %from, to = %to))]
    pub async fn transfer_ownership(
        &self,
        resource: &mut dyn Ownable,
        from: &OwnerRef,
        to: &OwnerRef,
    ) -> Result<bool, DomainError> {
        Self::check_owner(to)?;
        if self.mode() == OwnershipMode::Single {
            return self.set_owner(resource, to).await;
        }

        self.transfer_record(&resource.resource_ref(), from, to).await
    }

    /// Multiple-mode transfer on a bare resource reference.
    ///
    /// # Errors
    ///
    /// `WrongMode` in single mode, `InvalidOwner` when `to` already owns the
    /// resource, storage failures.
    #[instrument(skip(self), fields(resource = %resource, from = %from, to = %to))]
    pub async fn transfer_record(
        &self,
        resource: &ResourceRef,
        from: &OwnerRef,
        to: &OwnerRef,
    ) -> Result<bool, DomainError> {
        self.require_mode("transfer_record", OwnershipMode::Multiple)?;
        Self::check_owner(to)?;
        if from == to {
            return self.has_owner(resource, from).await;
        }

        match self.repo.reassign(resource, from, to).await? {
            ReassignOutcome::Moved(record) => {
                self.cache.invalidate(resource);
                info!(record_id = %record.id, "ownership transferred");
                self.emit(OwnershipEvent::Transferred {
                    resource: resource.clone(),
                    from: from.clone(),
                    to: to.clone(),
                });
                Ok(true)
            }
            ReassignOutcome::Missing => {
                debug!("source owner has no record");
                Ok(false)
            }
            ReassignOutcome::Conflict => {
                warn!("transfer target already owns the resource");
                Err(DomainError::invalid_owner(format!(
                    "{to} already owns {resource}"
                )))
            }
        }
    }

    /// Replace every owner of `resource` with `owners` in one transaction.
    ///
    /// Duplicates in `owners` collapse to one record. No events are published:
    /// the wipe and the re-adds are one bulk replacement.
    ///
    /// # Errors
    ///
    /// `WrongMode` in single mode, `InvalidRole`, `InvalidOwner`,
    /// `OwnerLimitReached` (checked before anything is deleted), storage failures.
    #[instrument(skip(self, owners, options), fields(resource = %resource, owners = owners.len()))]
    pub async fn sync_owners(
        &self,
        resource: &ResourceRef,
        owners: &[OwnerRef],
        options: AddOwnerOptions,
    ) -> Result<Vec<OwnershipRecord>, DomainError> {
        self.require_mode("sync_owners", OwnershipMode::Multiple)?;
        let AddOwnerOptions {
            role, permissions, ..
        } = options;
        let role = self.resolve_role(role.as_deref())?;

        let mut seen = HashSet::with_capacity(owners.len());
        let mut fresh = Vec::with_capacity(owners.len());
        for owner in owners {
            Self::check_owner(owner)?;
            if seen.insert(owner) {
                fresh.push(NewOwnership {
                    resource: resource.clone(),
                    owner: owner.clone(),
                    role: role.clone(),
                    permissions: permissions.clone(),
                });
            }
        }

        if let Some(max) = self.settings.max_owners
            && fresh.len() > max
        {
            warn!(requested = fresh.len(), max, "owner limit reached");
            return Err(DomainError::OwnerLimitReached {
                resource: resource.clone(),
                max,
            });
        }

        let records = self.repo.replace_all(resource, fresh).await?;
        self.cache.invalidate(resource);
        info!(owners = records.len(), "owners synchronized");
        Ok(records)
    }

    /// # Errors
    ///
    /// `WrongMode` in single mode, `InvalidRole`, storage failures.
    #[instrument(skip(self), fields(resource = %resource, owner = %owner))]
    pub async fn update_owner_role(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        role: &str,
    ) -> Result<bool, DomainError> {
        self.require_mode("update_owner_role", OwnershipMode::Multiple)?;
        let role = self.resolve_role(Some(role))?;

        let updated = self.repo.update_role(resource, owner, &role).await?;
        if updated {
            self.cache.invalidate(resource);
            info!("owner role updated");
            self.emit(OwnershipEvent::Updated {
                resource: resource.clone(),
                delta: OwnershipDelta::owner(owner.clone()).with_role(role),
            });
        }
        Ok(updated)
    }

    /// Remove every owner: all records in multiple mode (silently), the inline
    /// owner in single mode. Returns the number of owners removed.
    ///
    /// # Errors
    ///
    /// Storage failures.
    #[instrument(skip(self, resource), fields(resource = %resource.resource_ref()))]
    pub async fn clear_all_owners(&self, resource: &mut dyn Ownable) -> Result<u64, DomainError> {
        match self.mode() {
            OwnershipMode::Single => {
                let had_owner = resource.owner_ref().is_some();
                let saved = self.clear_owner(resource).await?;
                Ok(u64::from(saved && had_owner))
            }
            OwnershipMode::Multiple => {
                let reference = resource.resource_ref();
                let deleted = self.repo.delete_all(&reference).await?;
                self.cache.invalidate(&reference);
                info!(deleted, "all owners cleared");
                Ok(deleted)
            }
        }
    }

    // --- lifecycle hooks ------------------------------------------------

    /// Call before a new resource is first persisted.
    ///
    /// In single mode an unowned resource gets the current actor as owner.
    pub fn on_creating(&self, ctx: &ActorContext, resource: &mut dyn Ownable) {
        if self.mode() != OwnershipMode::Single || resource.owner_ref().is_some() {
            return;
        }
        if let Some(actor) = ctx.current() {
            debug!(resource = %resource.resource_ref(), owner = %actor, "assigning creator as owner");
            resource.set_owner_ref(Some(actor));
        }
    }

    /// Call after a new resource was persisted.
    ///
    /// In multiple mode with `auto_assign_creator`, the current actor is added
    /// under the default role.
    ///
    /// # Errors
    ///
    /// Errors of `add_owner`.
    pub async fn on_created(
        &self,
        ctx: &ActorContext,
        resource: &ResourceRef,
    ) -> Result<Option<OwnershipRecord>, DomainError> {
        if self.mode() != OwnershipMode::Multiple || !self.settings.auto_assign_creator {
            return Ok(None);
        }
        let Some(actor) = ctx.current() else {
            return Ok(None);
        };
        self.add_owner(resource, &actor, AddOwnerOptions::default())
            .await
            .map(Some)
    }

    /// Call before a resource is deleted.
    ///
    /// A hard delete (`force`) in multiple mode removes the resource's records;
    /// a soft delete keeps them. Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub async fn on_deleting(&self, resource: &ResourceRef, force: bool) -> Result<u64, DomainError> {
        if self.mode() != OwnershipMode::Multiple || !force {
            return Ok(0);
        }
        let deleted = self.repo.delete_all(resource).await?;
        self.cache.invalidate(resource);
        debug!(resource = %resource, deleted, "ownership records cascaded");
        Ok(deleted)
    }
}
