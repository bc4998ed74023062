use std::fmt;

use parking_lot::Mutex;

use crate::{AuthnResolver, OwnerRef};

/// Where the current unit of work runs.
///
/// Background work (console commands, queue workers, seeders) is not scoped to
/// the current actor unless the configuration asks for it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Interactive,
    Background,
}

/// `ActorContext` holds the "current acting owner" for one request or job.
///
/// The current actor is the explicitly set one if any, otherwise the actor the
/// authentication layer resolved for the configured guard. One context is
/// created per unit of work and passed by reference; it is never shared between
/// concurrent requests.
pub struct ActorContext {
    guard: String,
    authenticated: Option<OwnerRef>,
    explicit: Mutex<Option<OwnerRef>>,
    mode: ExecutionMode,
}

impl ActorContext {
    /// Create a new `ActorContext` builder
    #[must_use]
    pub fn builder() -> ActorContextBuilder {
        ActorContextBuilder::default()
    }

    /// Context with no authenticated and no explicit actor.
    #[must_use]
    pub fn anonymous() -> Self {
        ActorContextBuilder::default().build()
    }

    /// Resolve the authenticated actor for `guard` and start a fresh context.
    #[must_use]
    pub fn resolve(authn: &dyn AuthnResolver, guard: &str, mode: ExecutionMode) -> Self {
        let authenticated = authn.authenticated(guard);
        tracing::trace!(guard, actor = ?authenticated, "resolved authenticated actor");
        ActorContextBuilder {
            guard: Some(guard.to_owned()),
            authenticated,
            actor: None,
            mode,
        }
        .build()
    }

    #[must_use]
    pub fn guard(&self) -> &str {
        &self.guard
    }

    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    #[must_use]
    pub fn is_background(&self) -> bool {
        self.mode == ExecutionMode::Background
    }

    /// The actor authenticated for this context's guard, ignoring overrides.
    #[must_use]
    pub fn authenticated(&self) -> Option<&OwnerRef> {
        self.authenticated.as_ref()
    }

    /// The acting owner: explicit override first, then the authenticated actor.
    #[must_use]
    pub fn current(&self) -> Option<OwnerRef> {
        self.explicit
            .lock()
            .clone()
            .or_else(|| self.authenticated.clone())
    }

    /// Replace the explicit actor. `None` falls back to the authenticated one.
    pub fn set(&self, actor: Option<OwnerRef>) {
        *self.explicit.lock() = actor;
    }

    pub fn clear(&self) {
        self.set(None);
    }

    /// Act as `actor` until the returned guard is dropped.
    ///
    /// Guards must be dropped in reverse order of creation; each one restores
    /// the value that was in place when it was entered.
    #[must_use = "the previous actor is restored as soon as the scope is dropped"]
    pub fn enter(&self, actor: OwnerRef) -> ActorScope<'_> {
        let previous = self.explicit.lock().replace(actor);
        ActorScope {
            ctx: self,
            previous: Some(previous),
        }
    }

    /// Run `f` while acting as `actor`; the previous actor is restored on every
    /// exit path, including early returns of an `Err` and panics.
    pub fn run_as<R>(&self, actor: OwnerRef, f: impl FnOnce() -> R) -> R {
        let _scope = self.enter(actor);
        f()
    }
}

impl fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext")
            .field("guard", &self.guard)
            .field("authenticated", &self.authenticated)
            .field("explicit", &*self.explicit.lock())
            .field("mode", &self.mode)
            .finish()
    }
}

/// Scope guard returned by [`ActorContext::enter`].
pub struct ActorScope<'a> {
    ctx: &'a ActorContext,
    previous: Option<Option<OwnerRef>>,
}

impl Drop for ActorScope<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.ctx.explicit.lock() = previous;
        }
    }
}

#[derive(Default)]
pub struct ActorContextBuilder {
    guard: Option<String>,
    authenticated: Option<OwnerRef>,
    actor: Option<OwnerRef>,
    mode: ExecutionMode,
}

impl ActorContextBuilder {
    #[must_use]
    pub fn guard(mut self, guard: &str) -> Self {
        self.guard = Some(guard.to_owned());
        self
    }

    #[must_use]
    pub fn authenticated(mut self, actor: OwnerRef) -> Self {
        self.authenticated = Some(actor);
        self
    }

    /// Explicit actor set before any work starts.
    #[must_use]
    pub fn actor(mut self, actor: OwnerRef) -> Self {
        self.actor = Some(actor);
        self
    }

    #[must_use]
    pub fn background(mut self) -> Self {
        self.mode = ExecutionMode::Background;
        self
    }

    #[must_use]
    pub fn build(self) -> ActorContext {
        ActorContext {
            guard: self.guard.unwrap_or_else(|| "web".to_owned()),
            authenticated: self.authenticated,
            explicit: Mutex::new(self.actor),
            mode: self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticAuthn;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn user(id: u32) -> OwnerRef {
        OwnerRef::new("user", id)
    }

    #[test]
    fn anonymous_has_no_actor() {
        let ctx = ActorContext::anonymous();
        assert_eq!(ctx.current(), None);
        assert_eq!(ctx.guard(), "web");
        assert!(!ctx.is_background());
    }

    #[test]
    fn explicit_actor_wins_over_authenticated() {
        let ctx = ActorContext::builder().authenticated(user(1)).build();
        assert_eq!(ctx.current(), Some(user(1)));

        ctx.set(Some(user(2)));
        assert_eq!(ctx.current(), Some(user(2)));
        assert_eq!(ctx.authenticated(), Some(&user(1)));

        ctx.clear();
        assert_eq!(ctx.current(), Some(user(1)));
    }

    #[test]
    fn resolve_reads_the_configured_guard() {
        let authn = StaticAuthn::new()
            .with_actor("web", user(1))
            .with_actor("api", user(9));

        let ctx = ActorContext::resolve(&authn, "api", ExecutionMode::Background);
        assert_eq!(ctx.current(), Some(user(9)));
        assert_eq!(ctx.guard(), "api");
        assert!(ctx.is_background());
    }

    #[test]
    fn run_as_restores_previous_actor() {
        let ctx = ActorContext::builder().actor(user(1)).build();

        let seen = ctx.run_as(user(2), || ctx.current());
        assert_eq!(seen, Some(user(2)));
        assert_eq!(ctx.current(), Some(user(1)));
    }

    #[test]
    fn run_as_restores_after_error() {
        let ctx = ActorContext::anonymous();

        let result: Result<(), &str> = ctx.run_as(user(3), || {
            assert_eq!(ctx.current(), Some(user(3)));
            Err("boom")
        });
        assert!(result.is_err());
        assert_eq!(ctx.current(), None);
    }

    #[test]
    fn run_as_restores_after_panic() {
        let ctx = ActorContext::builder().authenticated(user(1)).build();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            ctx.run_as(user(4), || panic!("unit of work failed"));
        }));
        assert!(outcome.is_err());
        assert_eq!(ctx.current(), Some(user(1)));
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let ctx = ActorContext::builder().actor(user(1)).build();
        {
            let _outer = ctx.enter(user(2));
            {
                let _inner = ctx.enter(user(3));
                assert_eq!(ctx.current(), Some(user(3)));
            }
            assert_eq!(ctx.current(), Some(user(2)));
        }
        assert_eq!(ctx.current(), Some(user(1)));
    }
}
