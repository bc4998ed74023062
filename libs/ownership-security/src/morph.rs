//! Polymorphic (type tag + id) references to owners and ownable resources.
//!
//! Identifiers are kept as opaque strings so that a numeric key `42` and a
//! string key `"42"` compare equal, the same way they do once stored in a
//! `*_id` column.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference to an entity that can own resources (user, team, organization...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerRef {
    owner_type: String,
    owner_id: String,
}

impl OwnerRef {
    #[must_use]
    pub fn new(owner_type: impl Into<String>, owner_id: impl ToString) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id: owner_id.to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn owner_type(&self) -> &str {
        &self.owner_type
    }

    #[inline]
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// A reference is usable only when both the type tag and the id are non-blank.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.owner_type.trim().is_empty() && !self.owner_id.trim().is_empty()
    }

    /// Pairwise (type, id) comparison against raw attribute values.
    #[must_use]
    pub fn matches(&self, owner_type: &str, owner_id: &str) -> bool {
        self.owner_type == owner_type && self.owner_id == owner_id
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner_type, self.owner_id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid owner reference '{0}', expected '<type>#<id>'")]
pub struct ParseOwnerRefError(pub String);

/// Parses the `type#id` form produced by `Display`.
impl FromStr for OwnerRef {
    type Err = ParseOwnerRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner_type, owner_id) = s
            .split_once('#')
            .ok_or_else(|| ParseOwnerRefError(s.to_owned()))?;
        let owner = OwnerRef::new(owner_type.trim(), owner_id.trim());
        if owner.is_valid() {
            Ok(owner)
        } else {
            Err(ParseOwnerRefError(s.to_owned()))
        }
    }
}

/// Reference to an ownable resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    resource_type: String,
    resource_id: String,
}

impl ResourceRef {
    #[must_use]
    pub fn new(resource_type: impl Into<String>, resource_id: impl ToString) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    #[inline]
    #[must_use]
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource_type, self.resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_compare_equal() {
        assert_eq!(OwnerRef::new("user", 42), OwnerRef::new("user", "42"));
        assert_eq!(ResourceRef::new("post", 7_u64), ResourceRef::new("post", "7"));
    }

    #[test]
    fn type_tag_participates_in_equality() {
        assert_ne!(OwnerRef::new("user", 1), OwnerRef::new("team", 1));
        assert!(OwnerRef::new("user", 1).matches("user", "1"));
        assert!(!OwnerRef::new("user", 1).matches("team", "1"));
    }

    #[test]
    fn blank_parts_are_invalid() {
        assert!(OwnerRef::new("user", 1).is_valid());
        assert!(!OwnerRef::new("", 1).is_valid());
        assert!(!OwnerRef::new("user", " ").is_valid());
    }

    #[test]
    fn parses_display_form() {
        assert_eq!("user#42".parse::<OwnerRef>(), Ok(OwnerRef::new("user", 42)));
        assert_eq!(" team # 7 ".parse::<OwnerRef>(), Ok(OwnerRef::new("team", 7)));
        assert!("user".parse::<OwnerRef>().is_err());
        assert!("#1".parse::<OwnerRef>().is_err());
    }

    #[test]
    fn display_and_serde_shape() {
        let owner = OwnerRef::new("user", 5);
        assert_eq!(owner.to_string(), "user#5");

        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["owner_type"], "user");
        assert_eq!(json["owner_id"], "5");

        let back: OwnerRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, owner);
    }
}
