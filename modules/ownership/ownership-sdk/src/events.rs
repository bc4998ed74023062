//! Domain events emitted by the ownership mutation protocol.

use serde::{Deserialize, Serialize};

use ownership_security::{OwnerRef, ResourceRef};

use crate::models::{OwnershipDelta, OwnershipRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OwnershipEvent {
    /// A new (resource, owner) pair was recorded.
    Created {
        resource: ResourceRef,
        record: OwnershipRecord,
    },
    Updated {
        resource: ResourceRef,
        delta: OwnershipDelta,
    },
    /// `removed` is the owner that was detached, if one was known.
    Deleted {
        resource: ResourceRef,
        removed: Option<OwnerRef>,
    },
    Transferred {
        resource: ResourceRef,
        from: OwnerRef,
        to: OwnerRef,
    },
}

/// Event discriminant, used to look up the per-event configuration switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnershipEventKind {
    Created,
    Updated,
    Deleted,
    Transferred,
}

impl OwnershipEvent {
    #[must_use]
    pub fn kind(&self) -> OwnershipEventKind {
        match self {
            OwnershipEvent::Created { .. } => OwnershipEventKind::Created,
            OwnershipEvent::Updated { .. } => OwnershipEventKind::Updated,
            OwnershipEvent::Deleted { .. } => OwnershipEventKind::Deleted,
            OwnershipEvent::Transferred { .. } => OwnershipEventKind::Transferred,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.kind() {
            OwnershipEventKind::Created => "OwnershipCreated",
            OwnershipEventKind::Updated => "OwnershipUpdated",
            OwnershipEventKind::Deleted => "OwnershipDeleted",
            OwnershipEventKind::Transferred => "OwnershipTransferred",
        }
    }

    #[must_use]
    pub fn resource(&self) -> &ResourceRef {
        match self {
            OwnershipEvent::Created { resource, .. }
            | OwnershipEvent::Updated { resource, .. }
            | OwnershipEvent::Deleted { resource, .. }
            | OwnershipEvent::Transferred { resource, .. } => resource,
        }
    }
}
