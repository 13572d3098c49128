//! Legacy account -> canonical identity mapping.
//!
//! [`IdentityResolver`] walks the KubeSaw `UserAccount` records once, reads
//! each account's propagated email claim, and maps it through the selected
//! [`Transform`]. Accounts that cannot be mapped are skipped and reported,
//! never stored with an empty identity.

use tracing::{debug, info, warn};

use super::address::clean_email;
use super::directory::{DirectoryLookup, DirectorySearch};
use crate::errors::IdentityError;
use crate::models::{AccountRecord, ClaimGap, IdentityMapping};

/// How an email claim becomes a canonical identity.
pub enum Transform<S> {
    /// Normalized email, no external calls.
    Deterministic,
    /// Short identity from the corporate directory.
    Directory(DirectoryLookup<S>),
}

impl<S: DirectorySearch> Transform<S> {
    /// Map one email claim. `Ok(None)` means "leave this account unmapped".
    pub async fn apply(&mut self, email: &str) -> Result<Option<String>, IdentityError> {
        match self {
            Self::Deterministic => {
                let cleaned = clean_email(email);
                Ok((!cleaned.is_empty()).then_some(cleaned))
            }
            Self::Directory(lookup) => lookup.resolve(email).await,
        }
    }

    /// Short name used in logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deterministic => "email",
            Self::Directory(_) => "user",
        }
    }
}

/// Why an account was left out of the mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmappedReason {
    /// The account's claims structure was incomplete.
    MissingClaim(ClaimGap),
    /// The transform produced no identity for this email.
    NotFound { email: String },
}

impl std::fmt::Display for UnmappedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingClaim(gap) => write!(f, "{}", gap),
            Self::NotFound { email } => write!(f, "no user found for email {}", email),
        }
    }
}

/// An account that did not make it into the mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unmapped {
    pub account: String,
    pub reason: UnmappedReason,
}

/// Output of [`IdentityResolver::build_mapping`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub mapping: IdentityMapping,
    pub unmapped: Vec<Unmapped>,
}

/// Builds the [`IdentityMapping`] for a batch of accounts.
pub struct IdentityResolver<S> {
    transform: Transform<S>,
}

impl<S: DirectorySearch> IdentityResolver<S> {
    pub fn new(transform: Transform<S>) -> Self {
        Self { transform }
    }

    /// Name of the active transform (`email` or `user`).
    pub fn strategy(&self) -> &'static str {
        self.transform.name()
    }

    /// Map every account that has an email claim and a non-empty result.
    ///
    /// Missing claims and unresolved emails are logged and returned in
    /// [`Resolution::unmapped`]; only directory failures abort.
    pub async fn build_mapping(
        &mut self,
        accounts: &[AccountRecord],
    ) -> Result<Resolution, IdentityError> {
        info!(
            accounts = accounts.len(),
            strategy = self.strategy(),
            "building identity mapping"
        );

        let mut resolution = Resolution::default();

        for account in accounts {
            let email = match account.contact_address() {
                Ok(email) => email,
                Err(gap) => {
                    warn!(account = %account.name, reason = %gap, "skipping UserAccount");
                    resolution.unmapped.push(Unmapped {
                        account: account.name.clone(),
                        reason: UnmappedReason::MissingClaim(gap),
                    });
                    continue;
                }
            };

            match self.transform.apply(email).await? {
                Some(identity) if !identity.is_empty() => {
                    debug!(account = %account.name, identity = %identity, "mapped account");
                    resolution.mapping.insert(account.name.clone(), identity);
                }
                _ => {
                    info!(account = %account.name, email = %email, "no identity found");
                    resolution.unmapped.push(Unmapped {
                        account: account.name.clone(),
                        reason: UnmappedReason::NotFound {
                            email: email.to_string(),
                        },
                    });
                }
            }
        }

        info!(
            mapped = resolution.mapping.len(),
            unmapped = resolution.unmapped.len(),
            "identity mapping built"
        );
        Ok(resolution)
    }

    /// Give back the directory session (if any) so the caller can close it.
    pub fn into_directory(self) -> Option<S> {
        match self.transform {
            Transform::Deterministic => None,
            Transform::Directory(lookup) => Some(lookup.into_inner()),
        }
    }
}
