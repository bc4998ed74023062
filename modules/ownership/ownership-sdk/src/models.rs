use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use ownership_security::{OwnerRef, ResourceRef};

/// How ownership is stored for every ownable resource in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipMode {
    /// One owner per resource, kept as a `{morph}_type` / `{morph}_id` pair on the
    /// resource itself.
    Single,
    /// Many owners per resource, each with a role, kept in the ownership table.
    Multiple,
}

impl OwnershipMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OwnershipMode::Single => "single",
            OwnershipMode::Multiple => "multiple",
        }
    }
}

impl fmt::Display for OwnershipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported ownership mode '{0}', expected 'single' or 'multiple'")]
pub struct UnsupportedMode(pub String);

impl FromStr for OwnershipMode {
    type Err = UnsupportedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(OwnershipMode::Single),
            "multiple" => Ok(OwnershipMode::Multiple),
            other => Err(UnsupportedMode(other.to_owned())),
        }
    }
}

/// One (resource, owner) relationship in multiple-ownership mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub id: Uuid,
    pub resource: ResourceRef,
    pub owner: OwnerRef,
    pub role: Option<String>,
    /// Per-owner permission overrides granted on top of the role.
    pub permissions: Option<Vec<String>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl OwnershipRecord {
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Exact-match lookup in the custom overrides.
    #[must_use]
    pub fn has_override(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|perms| perms.iter().any(|p| p == permission))
    }
}

/// What changed in an `OwnershipUpdated` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl OwnershipDelta {
    #[must_use]
    pub fn owner(owner: OwnerRef) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: Option<Vec<String>>) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Contract for resources that can be owned.
///
/// `owner_ref` / `set_owner_ref` expose the inline `{morph}_type` / `{morph}_id`
/// attributes used in single mode. Multiple-mode resources keep them empty.
pub trait Ownable: Send + Sync {
    fn resource_ref(&self) -> ResourceRef;

    fn owner_ref(&self) -> Option<OwnerRef>;

    fn set_owner_ref(&mut self, owner: Option<OwnerRef>);
}

/// Plain ownable resource for hosts that track ownership by reference only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedResource {
    pub reference: ResourceRef,
    pub owner: Option<OwnerRef>,
}

impl OwnedResource {
    #[must_use]
    pub fn new(reference: ResourceRef) -> Self {
        Self {
            reference,
            owner: None,
        }
    }

    #[must_use]
    pub fn owned_by(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }
}

impl Ownable for OwnedResource {
    fn resource_ref(&self) -> ResourceRef {
        self.reference.clone()
    }

    fn owner_ref(&self) -> Option<OwnerRef> {
        self.owner.clone()
    }

    fn set_owner_ref(&mut self, owner: Option<OwnerRef>) {
        self.owner = owner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Single".parse::<OwnershipMode>(), Ok(OwnershipMode::Single));
        assert_eq!(" multiple ".parse::<OwnershipMode>(), Ok(OwnershipMode::Multiple));
        assert_eq!(
            "shared".parse::<OwnershipMode>(),
            Err(UnsupportedMode("shared".to_owned()))
        );
    }

    #[test]
    fn mode_serializes_lowercase() {
        let json = serde_json::to_string(&OwnershipMode::Multiple).unwrap();
        assert_eq!(json, "\"multiple\"");
    }

    #[test]
    fn override_lookup_is_exact() {
        let now = OffsetDateTime::now_utc();
        let record = OwnershipRecord {
            id: Uuid::new_v4(),
            resource: ResourceRef::new("post", 1),
            owner: OwnerRef::new("user", 1),
            role: Some("editor".to_owned()),
            permissions: Some(vec!["delete".to_owned()]),
            created_at: now,
            updated_at: now,
        };

        assert!(record.has_override("delete"));
        assert!(!record.has_override("del"));
        assert_eq!(record.role(), Some("editor"));
    }

    #[test]
    fn delta_omits_untouched_fields() {
        let delta = OwnershipDelta::owner(OwnerRef::new("user", 2)).with_role("viewer");
        let json = serde_json::to_value(&delta).unwrap();

        assert_eq!(json["role"], "viewer");
        assert!(json.get("permissions").is_none());
    }

    #[test]
    fn owned_resource_tracks_inline_owner() {
        let mut post = OwnedResource::new(ResourceRef::new("post", 3));
        assert_eq!(post.owner_ref(), None);

        post.set_owner_ref(Some(OwnerRef::new("user", 9)));
        assert_eq!(post.owner_ref(), Some(OwnerRef::new("user", 9)));
        assert_eq!(post.resource_ref(), ResourceRef::new("post", "3"));
    }
}
