//! LDAP-backed directory session.
//!
//! [`LdapSession`] owns a single connection to the corporate directory. The
//! connection is opened lazily on the first search and reused for every
//! following one; the caller closes it with [`LdapSession::close`] once
//! identity resolution is finished.

use ldap3::{ldap_escape, Ldap, LdapConnAsync, Scope, SearchEntry};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::directory::DirectorySearch;
use crate::config::DirectoryConfig;
use crate::errors::IdentityError;

/// A lazily connected, reusable LDAP session.
pub struct LdapSession {
    url: String,
    base_dn: String,
    bind_dn: Option<String>,
    bind_password: Option<String>,
    conn: OnceCell<Ldap>,
}

impl LdapSession {
    /// Create a new session from directory settings.
    ///
    /// This does not connect -- the connection is deferred until the first
    /// search.
    pub fn new(config: &DirectoryConfig) -> Self {
        info!(url = %config.url, base_dn = %config.base_dn, "created LDAP session");
        Self {
            url: config.url.clone(),
            base_dn: config.base_dn.clone(),
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone(),
            conn: OnceCell::new(),
        }
    }

    /// Return whether the underlying connection has been established.
    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    /// Return a handle to the shared connection, connecting on first use.
    async fn handle(&self) -> Result<Ldap, IdentityError> {
        let ldap = self.conn.get_or_try_init(|| self.connect()).await?;
        Ok(ldap.clone())
    }

    async fn connect(&self) -> Result<Ldap, IdentityError> {
        debug!(url = %self.url, "connecting to LDAP server");
        let (conn, mut ldap) =
            LdapConnAsync::new(&self.url)
                .await
                .map_err(|e| IdentityError::ConnectFailed {
                    url: self.url.clone(),
                    detail: e.to_string(),
                })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver stopped");
            }
        });

        if let Some((bind_dn, password)) = self.credentials() {
            ldap.simple_bind(bind_dn, password)
                .await
                .and_then(|res| res.success())
                .map_err(|e| IdentityError::ConnectFailed {
                    url: self.url.clone(),
                    detail: format!("bind as '{}' failed: {}", bind_dn, e),
                })?;
            debug!(bind_dn = %bind_dn, "LDAP bind succeeded");
        }

        info!(url = %self.url, "connected to LDAP server");
        Ok(ldap)
    }

    /// Bind DN and password for a simple bind, or `None` for anonymous access.
    ///
    /// A DN without a password stays anonymous: binding with an empty
    /// password would be an unauthenticated bind instead.
    fn credentials(&self) -> Option<(&str, &str)> {
        let bind_dn = self.bind_dn.as_deref()?;
        match self.bind_password.as_deref() {
            Some(password) if !password.is_empty() => Some((bind_dn, password)),
            _ => {
                warn!(bind_dn, "no bind password resolved, using anonymous access");
                None
            }
        }
    }

    /// Unbind and drop the connection, if one was opened.
    pub async fn close(mut self) -> Result<(), IdentityError> {
        let Some(mut ldap) = self.conn.take() else {
            return Ok(());
        };
        ldap.unbind().await.map_err(|e| IdentityError::ConnectFailed {
            url: self.url.clone(),
            detail: format!("unbind failed: {}", e),
        })?;
        debug!(url = %self.url, "LDAP session closed");
        Ok(())
    }
}

impl DirectorySearch for LdapSession {
    async fn first_value(
        &mut self,
        filter_attribute: &str,
        value: &str,
        wanted_attribute: &str,
    ) -> Result<Option<String>, IdentityError> {
        let mut ldap = self.handle().await?;
        let filter = format!("({}={})", filter_attribute, ldap_escape(value));

        let (entries, _) = ldap
            .search(&self.base_dn, Scope::Subtree, &filter, vec![wanted_attribute])
            .await
            .and_then(|res| res.success())
            .map_err(|e| IdentityError::SearchFailed {
                attribute: filter_attribute.to_string(),
                value: value.to_string(),
                detail: e.to_string(),
            })?;

        debug!(filter = %filter, matches = entries.len(), "LDAP search");

        Ok(entries.into_iter().next().and_then(|entry| {
            SearchEntry::construct(entry)
                .attrs
                .remove(wanted_attribute)
                .and_then(|values| values.into_iter().next())
        }))
    }
}
