//! Error types for the ownership module.

use thiserror::Error;

use ownership_security::ResourceRef;

/// Errors that can occur when using the ownership API.
#[derive(Debug, Error)]
pub enum OwnershipError {
    /// Unknown role, an operation called under the wrong ownership mode, or an
    /// unusable owner reference.
    #[error("invalid owner: {0}")]
    InvalidOwner(String),

    /// The resource already has the configured maximum number of owners.
    #[error("resource {resource} already has the maximum of {max} owners")]
    OwnerLimitReached {
        /// The resource that is full.
        resource: ResourceRef,
        /// Configured limit.
        max: usize,
    },

    /// The acting owner may not perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An internal error occurred (storage failure and similar).
    #[error("internal error: {0}")]
    Internal(String),
}

impl OwnershipError {
    #[must_use]
    pub fn invalid_owner(message: impl Into<String>) -> Self {
        Self::InvalidOwner(message.into())
    }

    #[must_use]
    pub fn is_invalid_owner(&self) -> bool {
        matches!(self, Self::InvalidOwner(_))
    }
}
