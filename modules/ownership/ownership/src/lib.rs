//! Ownership Module
//!
//! Tracks which principals own which resources and answers authorization
//! questions about them.
//!
//! Two modes are supported:
//! - **single**: one owner per resource, kept in `{morph}_type` / `{morph}_id`
//!   columns of the resource itself
//! - **multiple**: any number of owners per resource, each with a role and
//!   optional permission overrides, kept in a dedicated ownership table
//!
//! ## Public API
//!
//! The public API is defined in the `ownership-sdk` crate and re-exported here.
//! [`LocalClient`] implements `OwnershipClient` on top of [`OwnershipService`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// === PUBLIC API (from SDK) ===
pub use ownership_sdk::{
    Ownable, OwnedResource, OwnershipClient, OwnershipDelta, OwnershipError, OwnershipEvent,
    OwnershipEventKind, OwnershipMode, OwnershipRecord,
};

pub mod config;
pub use config::{ConfigError, OwnershipConfig};

// === LOCAL CLIENT ===
pub use domain::local_client::LocalClient;

pub use domain::engine::{DecisionEngine, OwnedByScope};
pub use domain::error::DomainError;
pub use domain::policy::{OwnablePolicy, PolicyAction};
pub use domain::service::{AddOwnerOptions, OwnershipService};

// === INTERNAL MODULES ===
// Exposed for hosts that wire their own storage and for integration tests.
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;

#[cfg(test)]
pub(crate) mod test_support;
