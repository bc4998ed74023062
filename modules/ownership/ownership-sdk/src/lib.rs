//! Ownership SDK
//!
//! This crate provides the public API for the `ownership` module:
//!
//! - [`OwnershipClient`] - Public API trait for consumers
//! - [`OwnershipRecord`], [`OwnershipMode`], [`OwnershipDelta`] - Domain models
//! - [`Ownable`] - Contract implemented by ownable resources
//! - [`OwnershipEvent`] - Domain events emitted on ownership changes
//! - [`OwnershipError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use ownership_sdk::OwnershipClient;
//!
//! let owned = client.is_owned_by(&ctx, &post, None).await?;
//! client.add_owner(&post, &editor, Some("editor"), None).await?;
//! let can_edit = client.owner_has_permission(&post, &editor, "edit").await?;
//! ```

pub mod api;
pub mod error;
pub mod events;
pub mod models;

pub use api::OwnershipClient;
pub use error::OwnershipError;
pub use events::{OwnershipEvent, OwnershipEventKind};
pub use models::{
    Ownable, OwnedResource, OwnershipDelta, OwnershipMode, OwnershipRecord, UnsupportedMode,
};

pub use ownership_security::{OwnerRef, ResourceRef};
