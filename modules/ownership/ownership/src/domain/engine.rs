//! Ownership decisions: who owns a resource and what an owner may do with it.

use std::sync::Arc;

use ownership_sdk::{Ownable, OwnershipMode, OwnershipRecord};
use ownership_security::{ActorContext, BypassPolicyRef, OwnerRef, ResourceRef};
use tracing::{debug, instrument};

use super::cache::{DecisionCache, Question};
use super::error::DomainError;
use super::registry::RoleRegistry;
use super::repo::OwnershipRepository;

/// Role that is granted every permission regardless of the role table.
pub const OWNER_ROLE: &str = "owner";

/// Resolve a permission against one ownership record.
///
/// Order: `owner` role, role wildcard, role exact match, custom override.
#[must_use]
pub fn record_grants(
    registry: &RoleRegistry,
    record: &OwnershipRecord,
    permission: &str,
) -> bool {
    match record.role() {
        Some(OWNER_ROLE) => return true,
        Some(role) if registry.role_grants(role, permission) => return true,
        _ => {}
    }
    record.has_override(permission)
}

/// Row filter for listing ownable resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedByScope {
    /// No restriction.
    Unrestricted,
    /// Single mode: the inline `{morph}_type` / `{morph}_id` columns match.
    InlineOwner(OwnerRef),
    /// Multiple mode: the resource has an ownership record for this owner.
    OwnershipRecord(OwnerRef),
    /// Multiple mode: the resource has at least one ownership record.
    AnyOwnershipRecord,
}

#[derive(Clone)]
pub struct DecisionEngine {
    mode: OwnershipMode,
    apply_global_scope: bool,
    scope_in_console: bool,
    repo: Arc<dyn OwnershipRepository>,
    registry: Arc<RoleRegistry>,
    cache: Arc<DecisionCache>,
    bypass: BypassPolicyRef,
}

/// Scoping switches of the engine, taken from the module configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScopeSettings {
    pub apply_global_scope: bool,
    pub scope_in_console: bool,
}

impl DecisionEngine {
    #[must_use]
    pub fn new(
        mode: OwnershipMode,
        scope: ScopeSettings,
        repo: Arc<dyn OwnershipRepository>,
        registry: Arc<RoleRegistry>,
        cache: Arc<DecisionCache>,
        bypass: BypassPolicyRef,
    ) -> Self {
        Self {
            mode,
            apply_global_scope: scope.apply_global_scope,
            scope_in_console: scope.scope_in_console,
            repo,
            registry,
            cache,
            bypass,
        }
    }

    #[must_use]
    pub fn mode(&self) -> OwnershipMode {
        self.mode
    }

    #[must_use]
    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Record lookups only mean something in multiple mode.
    fn uses_records(&self, operation: &'static str) -> bool {
        let uses = self.mode == OwnershipMode::Multiple;
        if !uses {
            debug!(operation, "no ownership records in single mode");
        }
        uses
    }

    /// Whether `candidate` owns `resource`; `None` means the current actor.
    ///
    /// # Errors
    ///
    /// Storage failures in multiple mode.
    #[instrument(skip(self, ctx, resource, candidate), fields(resource = %resource.resource_ref()))]
    pub async fn is_owned_by(
        &self,
        ctx: &ActorContext,
        resource: &dyn Ownable,
        candidate: Option<&OwnerRef>,
    ) -> Result<bool, DomainError> {
        let Some(candidate) = candidate.cloned().or_else(|| ctx.current()) else {
            debug!("no candidate owner and no current actor");
            return Ok(false);
        };

        match self.mode {
            OwnershipMode::Single => {
                let owned = resource.owner_ref().is_some_and(|owner| owner == candidate);
                debug!(candidate = %candidate, owned, "single-mode ownership check");
                Ok(owned)
            }
            OwnershipMode::Multiple => self.has_owner(&resource.resource_ref(), &candidate).await,
        }
    }

    /// # Errors
    ///
    /// Storage failures. Always `false` in single mode.
    #[instrument(skip(self), fields(resource = %resource, owner = %owner))]
    pub async fn has_owner(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
    ) -> Result<bool, DomainError> {
        if !self.uses_records("has_owner") {
            return Ok(false);
        }

        let question = Question::HasOwner(owner.clone());
        if let Some(answer) = self.cache.get(resource, &question) {
            return Ok(answer);
        }

        let seen = self.cache.generation(resource);
        let owned = self.repo.find(resource, owner).await?.is_some();
        self.cache.put(resource, seen, question, owned);
        debug!(owned, "ownership record lookup");
        Ok(owned)
    }

    /// # Errors
    ///
    /// Storage failures. Always `false` in single mode.
    #[instrument(skip(self), fields(resource = %resource, owner = %owner))]
    pub async fn owner_has_permission(
        &self,
        resource: &ResourceRef,
        owner: &OwnerRef,
        permission: &str,
    ) -> Result<bool, DomainError> {
        if !self.uses_records("owner_has_permission") {
            return Ok(false);
        }

        let question = Question::Permission(owner.clone(), permission.to_owned());
        if let Some(answer) = self.cache.get(resource, &question) {
            return Ok(answer);
        }

        let seen = self.cache.generation(resource);
        let granted = match self.repo.find(resource, owner).await? {
            Some(record) => record_grants(&self.registry, &record, permission),
            None => false,
        };
        self.cache.put(resource, seen, question, granted);
        debug!(granted, "permission resolved");
        Ok(granted)
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
        if !self.uses_records("has_owner_with_role") {
            return Ok(false);
        }
        Ok(self
            .repo
            .find(resource, owner)
            .await?
            .is_some_and(|record| record.role() == Some(role)))
    }

    /// Whether listing queries in this unit of work are scoped to the current actor.
    #[must_use]
    pub fn should_scope(&self, ctx: &ActorContext) -> bool {
        if ctx.is_background() && !self.scope_in_console {
            return false;
        }
        let Some(actor) = ctx.current() else {
            return false;
        };
        !self.bypass.bypass(Some(&actor))
    }

    /// Explicit "owned by" filter: `owner`, or the current actor when `None`.
    ///
    /// Without any actor, single mode leaves the query unrestricted while
    /// multiple mode still requires at least one ownership record.
    #[must_use]
    pub fn owned_by(&self, ctx: &ActorContext, owner: Option<&OwnerRef>) -> OwnedByScope {
        let owner = owner.cloned().or_else(|| ctx.current());
        match (self.mode, owner) {
            (OwnershipMode::Single, Some(owner)) => OwnedByScope::InlineOwner(owner),
            (OwnershipMode::Single, None) => OwnedByScope::Unrestricted,
            (OwnershipMode::Multiple, Some(owner)) => OwnedByScope::OwnershipRecord(owner),
            (OwnershipMode::Multiple, None) => OwnedByScope::AnyOwnershipRecord,
        }
    }

    /// Automatic scope applied to every listing query of this unit of work.
    #[must_use]
    pub fn global_scope(&self, ctx: &ActorContext) -> OwnedByScope {
        self.owner_scope(ctx)
            .map_or(OwnedByScope::Unrestricted, OwnedByScope::InlineOwner)
    }

    /// The actor that automatic query scoping filters on, if scoping applies.
    ///
    /// Only single mode scopes automatically.
    #[must_use]
    pub fn owner_scope(&self, ctx: &ActorContext) -> Option<OwnerRef> {
        if self.mode != OwnershipMode::Single || !self.apply_global_scope {
            return None;
        }
        if self.should_scope(ctx) {
            ctx.current()
        } else {
            None
        }
    }
}
