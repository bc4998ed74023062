//! Authorization gate for ownable resources.

use std::fmt;

use ownership_sdk::Ownable;
use ownership_security::{ActorContext, BypassPolicyRef, OwnerRef};
use tracing::{debug, warn};

use super::engine::DecisionEngine;
use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyAction {
    View,
    Update,
    Delete,
}

impl PolicyAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyAction::View => "view",
            PolicyAction::Update => "update",
            PolicyAction::Delete => "delete",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grants view, update and delete to bypassing actors and to owners.
///
/// The acting user defaults to the context's current actor.
#[derive(Clone)]
pub struct OwnablePolicy {
    engine: DecisionEngine,
    bypass: BypassPolicyRef,
}

impl OwnablePolicy {
    #[must_use]
    pub fn new(engine: DecisionEngine, bypass: BypassPolicyRef) -> Self {
        Self { engine, bypass }
    }

    /// # Errors
    ///
    /// Storage failures in multiple mode.
    pub async fn view(
        &self,
        ctx: &ActorContext,
        user: Option<&OwnerRef>,
        resource: &dyn Ownable,
    ) -> Result<bool, DomainError> {
        self.allows(ctx, user, resource, PolicyAction::View).await
    }

    /// # Errors
    ///
    /// Storage failures in multiple mode.
    pub async fn update(
        &self,
        ctx: &ActorContext,
        user: Option<&OwnerRef>,
        resource: &dyn Ownable,
    ) -> Result<bool, DomainError> {
        self.allows(ctx, user, resource, PolicyAction::Update).await
    }

    /// # Errors
    ///
    /// Storage failures in multiple mode.
    pub async fn delete(
        &self,
        ctx: &ActorContext,
        user: Option<&OwnerRef>,
        resource: &dyn Ownable,
    ) -> Result<bool, DomainError> {
        self.allows(ctx, user, resource, PolicyAction::Delete).await
    }

    /// Whether `user` may perform `action` on `resource`.
    ///
    /// # Errors
    ///
    /// Storage failures in multiple mode.
    pub async fn allows(
        &self,
        ctx: &ActorContext,
        user: Option<&OwnerRef>,
        resource: &dyn Ownable,
        action: PolicyAction,
    ) -> Result<bool, DomainError> {
        let user = user.cloned().or_else(|| ctx.current());
        if self.bypass.bypass(user.as_ref()) {
            debug!(%action, user = ?user.as_ref().map(ToString::to_string), "ownership bypassed");
            return Ok(true);
        }
        self.engine.is_owned_by(ctx, resource, user.as_ref()).await
    }

    /// Like [`OwnablePolicy::allows`], failing with `Forbidden` on denial.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the action is denied; storage failures.
    pub async fn authorize(
        &self,
        ctx: &ActorContext,
        user: Option<&OwnerRef>,
        resource: &dyn Ownable,
        action: PolicyAction,
    ) -> Result<(), DomainError> {
        if self.allows(ctx, user, resource, action).await? {
            return Ok(());
        }
        let reference = resource.resource_ref();
        warn!(%action, resource = %reference, "ownership check denied");
        Err(DomainError::forbidden(format!("{action} denied on {reference}")))
    }
}
