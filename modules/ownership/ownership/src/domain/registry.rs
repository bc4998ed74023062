//! Role and permission registry built from the configured role table.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::MultipleOwnershipConfig;

/// Wildcard permission granting everything.
pub const WILDCARD: &str = "*";

/// Permissions granted by a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    All,
    Only(BTreeSet<String>),
}

impl PermissionSet {
    #[must_use]
    pub fn empty() -> Self {
        Self::Only(BTreeSet::new())
    }

    #[must_use]
    pub fn from_permissions<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = permissions.into_iter().map(Into::into).collect();
        if set.contains(WILDCARD) {
            Self::All
        } else {
            Self::Only(set)
        }
    }

    #[must_use]
    pub fn allows(&self, permission: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(permission),
        }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Key in the role table.
    pub key: String,
    pub label: String,
    pub description: String,
    pub permissions: PermissionSet,
}

/// Immutable lookup table of roles.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: BTreeMap<String, RoleDefinition>,
    default_role: String,
}

impl RoleRegistry {
    #[must_use]
    pub fn from_config(cfg: &MultipleOwnershipConfig) -> Self {
        let roles = cfg
            .roles
            .iter()
            .map(|(key, role)| {
                (
                    key.clone(),
                    RoleDefinition {
                        key: key.clone(),
                        label: role.name.clone(),
                        description: role.description.clone(),
                        permissions: PermissionSet::from_permissions(role.permissions.iter().cloned()),
                    },
                )
            })
            .collect();

        Self {
            roles,
            default_role: cfg.default_role.clone(),
        }
    }

    #[must_use]
    pub fn is_valid_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Permission set of `role`; an unknown role grants nothing.
    #[must_use]
    pub fn resolve_permissions(&self, role: &str) -> PermissionSet {
        self.roles
            .get(role)
            .map_or_else(PermissionSet::empty, |def| def.permissions.clone())
    }

    /// Whether `role` grants `permission`, via wildcard or exact match.
    #[must_use]
    pub fn role_grants(&self, role: &str, permission: &str) -> bool {
        self.roles
            .get(role)
            .is_some_and(|def| def.permissions.allows(permission))
    }

    #[must_use]
    pub fn role(&self, role: &str) -> Option<&RoleDefinition> {
        self.roles.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }

    #[must_use]
    pub fn default_role(&self) -> &str {
        &self.default_role
    }
}
