//! Domain model types shared by the resolver, transformer and orchestrator.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Legacy account name -> canonical identity.
///
/// Only successful resolutions are stored; absence means "do not migrate".
pub type IdentityMapping = BTreeMap<String, String>;

/// Tenant namespaces that had candidate RoleBindings but received none after
/// migration.
pub type OrphanReport = BTreeSet<String>;

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// A KubeSaw `UserAccount` snapshot, reduced to what identity resolution reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Legacy account name (unique within the account namespace).
    pub name: String,
    /// Raw `spec` object, if the resource had one.
    #[serde(default)]
    pub spec: Option<serde_json::Value>,
}

/// Why an account's contact address could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimGap {
    Spec,
    Claims,
    Email,
}

impl std::fmt::Display for ClaimGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spec => write!(f, "spec not found"),
            Self::Claims => write!(f, "claims not found"),
            Self::Email => write!(f, "email not found"),
        }
    }
}

impl AccountRecord {
    pub fn new(name: impl Into<String>, spec: Option<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }

    /// Read `spec.propagatedClaims.email`, reporting the first missing level.
    pub fn contact_address(&self) -> Result<&str, ClaimGap> {
        let spec = self
            .spec
            .as_ref()
            .and_then(|s| s.as_object())
            .ok_or(ClaimGap::Spec)?;
        let claims = spec
            .get("propagatedClaims")
            .and_then(|c| c.as_object())
            .ok_or(ClaimGap::Claims)?;
        claims
            .get("email")
            .and_then(|e| e.as_str())
            .ok_or(ClaimGap::Email)
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Counts gathered over one migration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub accounts: usize,
    pub mapped_accounts: usize,
    pub unmapped_accounts: usize,
    pub tenant_namespaces: usize,
    /// Tenant namespaces without a single candidate RoleBinding.
    pub namespaces_without_bindings: Vec<String>,
    pub candidate_bindings: usize,
    pub migrated_bindings: usize,
    pub skipped_bindings: usize,
    pub duplicates: usize,
    /// RoleBindings that could not be encoded and were left out.
    pub failed: usize,
    pub written: usize,
    pub orphans: Vec<String>,
}
