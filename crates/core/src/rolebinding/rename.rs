//! Name rewriting for migrated RoleBindings.
//!
//! Every substitution replaces the first occurrence only. Downstream tooling
//! predicts migrated names from the legacy ones, so later occurrences are
//! deliberately left alone.

use crate::config::RenameConfig;

/// Replace the first occurrence of `from` in `haystack` with `to`.
///
/// An empty `from` leaves `haystack` unchanged.
pub fn replace_first(haystack: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return haystack.to_string();
    }
    haystack.replacen(from, to, 1)
}

/// Product-token substitution for role and binding names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRules {
    legacy_token: String,
    target_token: String,
}

impl RenameRules {
    pub fn new(legacy_token: impl Into<String>, target_token: impl Into<String>) -> Self {
        Self {
            legacy_token: legacy_token.into(),
            target_token: target_token.into(),
        }
    }

    pub fn from_config(config: &RenameConfig) -> Self {
        Self::new(&config.legacy_token, &config.target_token)
    }

    /// `appstudio-user` -> `konflux-user`.
    pub fn role_name(&self, role: &str) -> String {
        replace_first(role, &self.legacy_token, &self.target_token)
    }

    /// Swap the product token, then the legacy subject for its new identity.
    pub fn binding_name(&self, name: &str, legacy_subject: &str, identity: &str) -> String {
        let renamed = replace_first(name, &self.legacy_token, &self.target_token);
        replace_first(&renamed, legacy_subject, identity)
    }
}
