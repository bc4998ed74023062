pub mod authn;
pub mod bypass;
pub mod context;
pub mod morph;

pub use authn::{AuthnResolver, AuthnResolverRef, StaticAuthn};
pub use bypass::{BypassPolicy, BypassPolicyRef, FnBypass, NoBypass, StaticBypass};
pub use context::{ActorContext, ActorContextBuilder, ActorScope, ExecutionMode};
pub use morph::{OwnerRef, ParseOwnerRefError, ResourceRef};
