use std::collections::HashMap;
use std::sync::Arc;

use crate::OwnerRef;

/// Type alias for a reference-counted authentication resolver
pub type AuthnResolverRef = Arc<dyn AuthnResolver>;

/// Resolves the currently authenticated actor for a named guard (realm).
///
/// The host's authentication layer implements this; the ownership module only
/// needs the resulting owner reference.
pub trait AuthnResolver: Send + Sync {
    fn authenticated(&self, guard: &str) -> Option<OwnerRef>;
}

/// Fixed guard -> actor table, for hosts that authenticate up front and for tests.
#[derive(Clone, Debug, Default)]
pub struct StaticAuthn {
    actors: HashMap<String, OwnerRef>,
}

impl StaticAuthn {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_actor(mut self, guard: &str, actor: OwnerRef) -> Self {
        self.actors.insert(guard.to_owned(), actor);
        self
    }
}

impl AuthnResolver for StaticAuthn {
    fn authenticated(&self, guard: &str) -> Option<OwnerRef> {
        self.actors.get(guard).cloned()
    }
}
