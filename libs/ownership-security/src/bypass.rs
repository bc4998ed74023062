use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::OwnerRef;

/// Type alias for a reference-counted bypass policy
pub type BypassPolicyRef = Arc<dyn BypassPolicy>;

/// Bypass predicate: when it returns `true` for an actor, every ownership and
/// permission check for that actor passes regardless of stored ownership.
///
/// Policies are consulted by the authorization gate before any ownership
/// lookup, and by query scoping to leave bypassing actors unrestricted.
pub trait BypassPolicy: Send + Sync {
    fn bypass(&self, actor: Option<&OwnerRef>) -> bool;
}

/// Nobody bypasses.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBypass;

impl BypassPolicy for NoBypass {
    fn bypass(&self, _actor: Option<&OwnerRef>) -> bool {
        false
    }
}

/// Host-supplied closure, e.g. `|actor| actor.is_some_and(is_super_admin)`.
pub struct FnBypass<F>(F);

impl<F> FnBypass<F>
where
    F: Fn(Option<&OwnerRef>) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self(predicate)
    }
}

impl<F> BypassPolicy for FnBypass<F>
where
    F: Fn(Option<&OwnerRef>) -> bool + Send + Sync,
{
    fn bypass(&self, actor: Option<&OwnerRef>) -> bool {
        (self.0)(actor)
    }
}

impl<F> fmt::Debug for FnBypass<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBypass").finish_non_exhaustive()
    }
}

/// Allow-list of actors (or whole owner types) that bypass ownership checks.
///
/// This is what a configuration file can express; anything smarter goes
/// through [`FnBypass`] or a custom [`BypassPolicy`].
#[derive(Clone, Debug, Default)]
pub struct StaticBypass {
    owners: HashSet<OwnerRef>,
    owner_types: HashSet<String>,
}

impl StaticBypass {
    #[must_use]
    pub fn new(
        owners: impl IntoIterator<Item = OwnerRef>,
        owner_types: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            owners: owners.into_iter().collect(),
            owner_types: owner_types.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty() && self.owner_types.is_empty()
    }
}

impl BypassPolicy for StaticBypass {
    fn bypass(&self, actor: Option<&OwnerRef>) -> bool {
        actor.is_some_and(|a| self.owners.contains(a) || self.owner_types.contains(a.owner_type()))
    }
}
