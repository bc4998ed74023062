//! Configuration for the ownership module.
//!
//! The configuration is read once at startup, validated, and injected into the
//! service. Nothing reads it again at call time.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ownership_sdk::{OwnershipEventKind, OwnershipMode};
use ownership_security::{OwnerRef, StaticBypass};

/// Prefix of environment overrides, e.g. `OWNERSHIP_CACHE__TTL=60`.
pub const ENV_PREFIX: &str = "OWNERSHIP_";

/// Longest accepted `cache.ttl`, in seconds (30 days).
pub const MAX_CACHE_TTL: u64 = 30 * 24 * 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ownership mode is not set, expected 'single' or 'multiple'")]
    ModeNotSet,

    #[error("default role '{0}' is not defined in the role table")]
    UnknownDefaultRole(String),

    #[error("unique_owner cannot be disabled: one record per (resource, owner) is a storage constraint")]
    UniqueOwnerDisabled,

    #[error("invalid morph name '{0}', expected an identifier")]
    InvalidMorphName(String),

    #[error("invalid ownership table name '{0}', expected an identifier")]
    InvalidTableName(String),

    #[error("invalid bypass owner '{0}', expected '<type>#<id>'")]
    InvalidBypassOwner(String),

    #[error("cache ttl of {0}s exceeds the maximum of {max}s", max = MAX_CACHE_TTL)]
    InvalidCacheTtl(u64),

    #[error("failed to load ownership configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Configuration for the ownership module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OwnershipConfig {
    /// `single` or `multiple`. There is no default: an unset mode is rejected
    /// by [`OwnershipConfig::validate`].
    pub mode: Option<OwnershipMode>,

    /// Prefix of the inline `{morph}_type` / `{morph}_id` columns (single mode).
    pub morph_name: String,

    /// Scope listing queries to the current actor (single mode).
    pub apply_global_scope: bool,

    /// Authentication guard the current actor is resolved from.
    pub guard: String,

    pub bypass: BypassConfig,

    /// Apply scoping in background work (console commands, queue workers).
    pub scope_in_console: bool,

    pub cache: CacheConfig,

    pub events: EventsConfig,

    pub multiple_ownership: MultipleOwnershipConfig,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            mode: None,
            morph_name: "owner".to_owned(),
            apply_global_scope: true,
            guard: "web".to_owned(),
            bypass: BypassConfig::default(),
            scope_in_console: false,
            cache: CacheConfig::default(),
            events: EventsConfig::default(),
            multiple_ownership: MultipleOwnershipConfig::default(),
        }
    }
}

/// Static allow-list of actors that skip ownership checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BypassConfig {
    /// Individual actors, as `type#id`.
    pub owners: Vec<String>,
    /// Every actor of these owner types.
    pub owner_types: Vec<String>,
}

impl BypassConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBypassOwner` for an entry that is not `type#id`.
    pub fn to_policy(&self) -> Result<StaticBypass, ConfigError> {
        let owners = self
            .owners
            .iter()
            .map(|raw| {
                raw.parse::<OwnerRef>()
                    .map_err(|_| ConfigError::InvalidBypassOwner(raw.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StaticBypass::new(owners, self.owner_types.iter().cloned()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Seconds a cached decision stays valid.
    pub ttl: u64,
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: 3600,
            prefix: "ownership_".to_owned(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct EventsConfig {
    pub ownership_created: bool,
    pub ownership_updated: bool,
    pub ownership_deleted: bool,
    pub ownership_transferred: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            ownership_created: true,
            ownership_updated: true,
            ownership_deleted: true,
            ownership_transferred: true,
        }
    }
}

impl EventsConfig {
    #[must_use]
    pub fn enabled(&self, kind: OwnershipEventKind) -> bool {
        match kind {
            OwnershipEventKind::Created => self.ownership_created,
            OwnershipEventKind::Updated => self.ownership_updated,
            OwnershipEventKind::Deleted => self.ownership_deleted,
            OwnershipEventKind::Transferred => self.ownership_transferred,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MultipleOwnershipConfig {
    pub table_name: String,
    pub default_role: String,
    pub roles: BTreeMap<String, RoleConfig>,
    /// Add the current actor as an owner of every newly created resource.
    pub auto_assign_creator: bool,
    pub validation: ValidationConfig,
}

impl Default for MultipleOwnershipConfig {
    fn default() -> Self {
        let roles = [
            ("owner", "Owner", "Full access to the resource", &["*"][..]),
            (
                "admin",
                "Administrator",
                "Can manage all aspects except ownership",
                &["view", "edit", "delete", "manage_users"][..],
            ),
            ("editor", "Editor", "Can view and edit content", &["view", "edit"][..]),
            ("viewer", "Viewer", "Can only view content", &["view"][..]),
        ]
        .into_iter()
        .map(|(key, name, description, permissions)| {
            (
                key.to_owned(),
                RoleConfig {
                    name: name.to_owned(),
                    description: description.to_owned(),
                    permissions: permissions.iter().map(|p| (*p).to_owned()).collect(),
                },
            )
        })
        .collect();

        Self {
            table_name: "ownerships".to_owned(),
            default_role: "owner".to_owned(),
            roles,
            auto_assign_creator: true,
            validation: ValidationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Human readable label.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Granted permissions; `*` grants everything.
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Maximum owners per resource, `None` for unlimited.
    pub max_owners: Option<usize>,
    pub unique_owner: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_owners: None,
            unique_owner: true,
        }
    }
}

impl OwnershipConfig {
    /// Load from an optional YAML file, then `OWNERSHIP_*` environment overrides
    /// (`__` separates nested keys).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` when a source cannot be read or does not match
    /// the configuration shape. The result is not validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Load` when the figment cannot be extracted.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Check the configuration and return the ownership mode it selects.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<OwnershipMode, ConfigError> {
        let mode = self.mode.ok_or(ConfigError::ModeNotSet)?;

        if !is_identifier(&self.morph_name) {
            return Err(ConfigError::InvalidMorphName(self.morph_name.clone()));
        }

        let multiple = &self.multiple_ownership;
        if !is_identifier(&multiple.table_name) {
            return Err(ConfigError::InvalidTableName(multiple.table_name.clone()));
        }
        if !multiple.roles.contains_key(&multiple.default_role) {
            return Err(ConfigError::UnknownDefaultRole(multiple.default_role.clone()));
        }
        if !multiple.validation.unique_owner {
            return Err(ConfigError::UniqueOwnerDisabled);
        }
        if self.cache.ttl > MAX_CACHE_TTL {
            return Err(ConfigError::InvalidCacheTtl(self.cache.ttl));
        }

        self.bypass.to_policy()?;

        Ok(mode)
    }
}

/// Column and table names are spliced into SQL, so only plain identifiers pass.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;
    use std::io::Write;

    fn with_mode(mode: OwnershipMode) -> OwnershipConfig {
        OwnershipConfig {
            mode: Some(mode),
            ..OwnershipConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let cfg = OwnershipConfig::default();
        assert_eq!(cfg.mode, None);
        assert_eq!(cfg.morph_name, "owner");
        assert!(cfg.apply_global_scope);
        assert_eq!(cfg.guard, "web");
        assert!(!cfg.scope_in_console);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.ttl_duration(), Duration::from_secs(3600));
        assert_eq!(cfg.cache.prefix, "ownership_");
        assert!(cfg.events.enabled(OwnershipEventKind::Transferred));

        let multiple = &cfg.multiple_ownership;
        assert_eq!(multiple.table_name, "ownerships");
        assert_eq!(multiple.default_role, "owner");
        assert!(multiple.auto_assign_creator);
        assert_eq!(multiple.validation.max_owners, None);
        assert_eq!(
            multiple.roles.keys().collect::<Vec<_>>(),
            ["admin", "editor", "owner", "viewer"]
        );
        assert_eq!(multiple.roles["editor"].permissions, ["view", "edit"]);
        assert_eq!(multiple.roles["owner"].permissions, ["*"]);
    }

    #[test]
    fn test_unset_mode_is_rejected() {
        let err = OwnershipConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::ModeNotSet));
    }

    #[test]
    fn test_validate_returns_mode() {
        assert_eq!(
            with_mode(OwnershipMode::Single).validate().unwrap(),
            OwnershipMode::Single
        );
        assert_eq!(
            with_mode(OwnershipMode::Multiple).validate().unwrap(),
            OwnershipMode::Multiple
        );
    }

    #[test]
    fn test_inconsistent_role_table_is_rejected() {
        let mut cfg = with_mode(OwnershipMode::Multiple);
        cfg.multiple_ownership.default_role = "maintainer".to_owned();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnknownDefaultRole(role)) if role == "maintainer"
        ));
    }

    #[test]
    fn test_unique_owner_cannot_be_disabled() {
        let mut cfg = with_mode(OwnershipMode::Multiple);
        cfg.multiple_ownership.validation.unique_owner = false;
        assert!(matches!(cfg.validate(), Err(ConfigError::UniqueOwnerDisabled)));
    }

    #[test]
    fn test_names_must_be_identifiers() {
        let mut cfg = with_mode(OwnershipMode::Single);
        cfg.morph_name = "owner; drop".to_owned();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidMorphName(_))));

        let mut cfg = with_mode(OwnershipMode::Multiple);
        cfg.multiple_ownership.table_name = "1ownerships".to_owned();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTableName(_))));
    }

    #[test]
    fn test_cache_ttl_is_capped() {
        let mut cfg = with_mode(OwnershipMode::Multiple);
        cfg.cache.ttl = MAX_CACHE_TTL;
        cfg.validate().unwrap();

        cfg.cache.ttl = u64::MAX;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidCacheTtl(u64::MAX))));
    }

    #[test]
    fn test_bypass_owners_are_parsed() {
        let mut cfg = with_mode(OwnershipMode::Single);
        cfg.bypass.owners = vec!["user#1".to_owned()];
        cfg.bypass.owner_types = vec!["service".to_owned()];
        cfg.validate().unwrap();

        let policy = cfg.bypass.to_policy().unwrap();
        assert!(!policy.is_empty());

        cfg.bypass.owners = vec!["root".to_owned()];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidBypassOwner(raw)) if raw == "root"
        ));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
mode: multiple
morph_name: author
cache:
  ttl: 60
events:
  ownership_updated: false
multiple_ownership:
  default_role: viewer
  roles:
    viewer:
      name: Viewer
      permissions: [view]
  validation:
    max_owners: 3
"#
        )
        .unwrap();

        let cfg = OwnershipConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.validate().unwrap(), OwnershipMode::Multiple);
        assert_eq!(cfg.morph_name, "author");
        assert_eq!(cfg.cache.ttl, 60);
        assert!(cfg.cache.enabled);
        assert!(!cfg.events.ownership_updated);
        assert!(cfg.events.ownership_created);
        assert_eq!(cfg.multiple_ownership.roles.len(), 1);
        assert_eq!(cfg.multiple_ownership.validation.max_owners, Some(3));
        assert!(cfg.multiple_ownership.validation.unique_owner);
    }

    #[test]
    fn test_unknown_fields_and_modes_fail_to_load() {
        let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
            "mode": "multiple",
            "model_namespace": "App",
        })));
        assert!(matches!(
            OwnershipConfig::from_figment(&figment),
            Err(ConfigError::Load(_))
        ));

        let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
            "mode": "shared",
        })));
        assert!(matches!(
            OwnershipConfig::from_figment(&figment),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("ownership.yaml", "mode: single\nguard: web\n")?;
            jail.set_env("OWNERSHIP_GUARD", "api");
            jail.set_env("OWNERSHIP_CACHE__ENABLED", "false");

            let cfg = OwnershipConfig::load(Some(Path::new("ownership.yaml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(cfg.mode, Some(OwnershipMode::Single));
            assert_eq!(cfg.guard, "api");
            assert!(!cfg.cache.enabled);
            Ok(())
        });
    }
}
