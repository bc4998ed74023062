//! Domain error types for the ownership module.

use ownership_sdk::{OwnershipError, OwnershipMode};
use ownership_security::ResourceRef;
use thiserror::Error;

/// Domain-level errors for the ownership module.
#[derive(Error, Debug)]
pub enum DomainError {
    /// The role is not a key of the configured role table.
    #[error("The role [{0}] is not valid.")]
    InvalidRole(String),

    /// The operation only exists in the other ownership mode.
    #[error("{operation} is only available in {required} ownership mode.")]
    WrongMode {
        operation: &'static str,
        required: OwnershipMode,
    },

    /// The owner (or transfer target) cannot be used.
    #[error("Invalid owner: {0}")]
    InvalidOwner(String),

    #[error("Resource {resource} already has the maximum of {max} owners")]
    OwnerLimitReached { resource: ResourceRef, max: usize },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    /// Creates an `InvalidRole` error.
    #[must_use]
    pub fn invalid_role(role: impl Into<String>) -> Self {
        Self::InvalidRole(role.into())
    }

    /// Creates a `WrongMode` error.
    #[must_use]
    pub fn wrong_mode(operation: &'static str, required: OwnershipMode) -> Self {
        Self::WrongMode {
            operation,
            required,
        }
    }

    /// Creates an `InvalidOwner` error.
    #[must_use]
    pub fn invalid_owner(message: impl Into<String>) -> Self {
        Self::InvalidOwner(message.into())
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Unknown role, wrong mode and unusable owner all surface to callers as
    /// `InvalidOwner`.
    #[must_use]
    pub fn is_invalid_owner(&self) -> bool {
        matches!(
            self,
            Self::InvalidRole(_) | Self::WrongMode { .. } | Self::InvalidOwner(_)
        )
    }
}

impl From<DomainError> for OwnershipError {
    fn from(e: DomainError) -> Self {
        match e {
            e @ (DomainError::InvalidRole(_) | DomainError::WrongMode { .. }) => {
                OwnershipError::invalid_owner(e.to_string())
            }
            DomainError::InvalidOwner(msg) => OwnershipError::InvalidOwner(msg),
            DomainError::OwnerLimitReached { resource, max } => {
                OwnershipError::OwnerLimitReached { resource, max }
            }
            DomainError::Forbidden(msg) => OwnershipError::Forbidden(msg),
            DomainError::Internal(e) => OwnershipError::Internal(e.to_string()),
        }
    }
}
