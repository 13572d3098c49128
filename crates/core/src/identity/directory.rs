//! Directory lookup: email address -> canonical short identity.

use tracing::debug;

use super::address::clean_email;
use crate::config::DirectoryConfig;
use crate::errors::IdentityError;

/// A directory that can be searched by a single attribute.
///
/// Implemented by [`LdapSession`](super::ldap::LdapSession); tests supply
/// in-memory directories. Searches take `&mut self`, so one session is never
/// queried concurrently.
#[allow(async_fn_in_trait)]
pub trait DirectorySearch {
    /// Search for entries whose `filter_attribute` equals `value` and return
    /// `wanted_attribute` of the first match, if any.
    async fn first_value(
        &mut self,
        filter_attribute: &str,
        value: &str,
        wanted_attribute: &str,
    ) -> Result<Option<String>, IdentityError>;
}

/// Resolves contact addresses against a directory, trying each search
/// attribute in order (primary mail first, then the preferred alias).
pub struct DirectoryLookup<S> {
    directory: S,
    identity_attribute: String,
    search_attributes: Vec<String>,
}

impl<S: DirectorySearch> DirectoryLookup<S> {
    pub fn new(directory: S, config: &DirectoryConfig) -> Self {
        Self {
            directory,
            identity_attribute: config.identity_attribute.clone(),
            search_attributes: config.search_attributes.clone(),
        }
    }

    /// Resolve an email address to a directory identity.
    ///
    /// The address is normalized first. `Ok(None)` means no entry matched
    /// under any search attribute; only directory failures are errors.
    pub async fn resolve(&mut self, address: &str) -> Result<Option<String>, IdentityError> {
        let cleaned = clean_email(address);

        for attribute in &self.search_attributes {
            let found = self
                .directory
                .first_value(attribute, &cleaned, &self.identity_attribute)
                .await?;
            match found {
                Some(identity) if !identity.is_empty() => {
                    debug!(email = %cleaned, attribute = %attribute, identity = %identity, "directory match");
                    return Ok(Some(identity));
                }
                _ => debug!(email = %cleaned, attribute = %attribute, "no directory match"),
            }
        }

        Ok(None)
    }

    /// Give back the directory so the caller can close it.
    pub fn into_inner(self) -> S {
        self.directory
    }
}
