//! TOML-based configuration for a migration run.
//!
//! Every field has a default matching the production KubeSaw member cluster
//! and corporate directory, so a configuration file is optional. The only
//! secret (the LDAP bind password) is referenced through an `_env` field and
//! resolved at runtime via [`MigrationConfig::resolve_env_vars`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level migration configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    pub log_level: String,

    /// Corporate directory (LDAP) settings.
    pub directory: DirectoryConfig,

    /// Where accounts, namespaces and RoleBindings are read from.
    pub cluster: ClusterConfig,

    /// How migrated RoleBindings are renamed and labelled.
    pub rename: RenameConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".into(),
            directory: DirectoryConfig::default(),
            cluster: ClusterConfig::default(),
            rename: RenameConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// LDAP directory connection and search settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DirectoryConfig {
    /// LDAP server URL (e.g. `ldap://ldap.corp.redhat.com:389`).
    pub url: String,

    /// Search base DN.
    pub base_dn: String,

    /// Attribute holding the canonical short identity (default `uid`).
    pub identity_attribute: String,

    /// Attributes matched against the normalized email, tried in order.
    pub search_attributes: Vec<String>,

    /// Optional bind DN. Anonymous bind when unset.
    pub bind_dn: Option<String>,

    /// Environment variable holding the bind password.
    pub bind_password_env: Option<String>,

    /// Resolved bind password.
    #[serde(skip)]
    pub bind_password: Option<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: "ldap://ldap.corp.redhat.com:389".into(),
            base_dn: "ou=users,dc=redhat,dc=com".into(),
            identity_attribute: "uid".into(),
            search_attributes: vec!["mail".into(), "rhatPreferredAlias".into()],
            bind_dn: None,
            bind_password_env: None,
            bind_password: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

/// Resource locations and filters on the member cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Namespace holding the `UserAccount` resources.
    pub account_namespace: String,

    /// Label selector identifying tenant namespaces.
    pub tenant_namespace_selector: String,

    /// Label selector identifying KubeSaw-provisioned RoleBindings.
    pub binding_selector: String,

    /// RoleBinding names that are never migrated.
    pub excluded_binding_names: Vec<String>,

    /// Namespaces whose RoleBindings are never migrated.
    pub excluded_namespaces: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            account_namespace: "toolchain-member-operator".into(),
            tenant_namespace_selector: "toolchain.dev.openshift.com/type=tenant".into(),
            binding_selector: "toolchain.dev.openshift.com/provider=codeready-toolchain".into(),
            excluded_binding_names: vec!["appstudio-pipelines-runner-rolebinding".into()],
            excluded_namespaces: vec!["toolchain-host-operator".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

/// Token substitution and labelling applied to migrated RoleBindings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenameConfig {
    /// Legacy product token found in role and binding names.
    pub legacy_token: String,

    /// Replacement product token.
    pub target_token: String,

    /// Classification label key set on every migrated RoleBinding.
    pub label_key: String,

    /// Classification label value.
    pub label_value: String,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            legacy_token: "appstudio".into(),
            target_token: "konflux".into(),
            label_key: "konflux-ci.dev/type".into(),
            label_value: "user".into(),
        }
    }
}

/// Template written by `wscli init`. Mirrors [`MigrationConfig::default`].
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# wscli configuration
# Every value below is the built-in default; delete what you do not change.

log_level = "warn"

[directory]
url = "ldap://ldap.corp.redhat.com:389"
base_dn = "ou=users,dc=redhat,dc=com"
identity_attribute = "uid"
search_attributes = ["mail", "rhatPreferredAlias"]
# bind_dn = "uid=svc-wscli,ou=users,dc=redhat,dc=com"
# bind_password_env = "WSCLI_LDAP_PASSWORD"

[cluster]
account_namespace = "toolchain-member-operator"
tenant_namespace_selector = "toolchain.dev.openshift.com/type=tenant"
binding_selector = "toolchain.dev.openshift.com/provider=codeready-toolchain"
excluded_binding_names = ["appstudio-pipelines-runner-rolebinding"]
excluded_namespaces = ["toolchain-host-operator"]

[rename]
legacy_token = "appstudio"
target_token = "konflux"
label_key = "konflux-ci.dev/type"
label_value = "user"
"#;

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl MigrationConfig {
    /// Load a [`MigrationConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: MigrationConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `*_env` fields from environment variables.
    ///
    /// A missing variable logs a warning and leaves the resolved field empty;
    /// the directory session then falls back to an anonymous bind.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.directory.bind_password_env {
            self.directory.bind_password =
                resolve_optional_env(env_name, "directory.bind_password_env");
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("directory.url", &self.directory.url),
            ("directory.base_dn", &self.directory.base_dn),
            ("directory.identity_attribute", &self.directory.identity_attribute),
            ("cluster.account_namespace", &self.cluster.account_namespace),
            ("rename.legacy_token", &self.rename.legacy_token),
            ("rename.label_key", &self.rename.label_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must not be empty".into(),
                });
            }
        }

        if self.directory.search_attributes.is_empty()
            || self.directory.search_attributes.iter().any(|a| a.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "directory.search_attributes".into(),
                detail: "at least one non-empty attribute is required".into(),
            });
        }

        if !self.directory.url.starts_with("ldap://") && !self.directory.url.starts_with("ldaps://")
        {
            return Err(ConfigError::InvalidValue {
                field: "directory.url".into(),
                detail: "must use the ldap:// or ldaps:// scheme".into(),
            });
        }

        if self.directory.bind_password_env.is_some() && self.directory.bind_dn.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "directory.bind_dn".into(),
                detail: "bind_password_env is set but bind_dn is missing".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
