//! Read-only access to the KubeSaw member cluster.
//!
//! [`ClusterSource`] is the narrow interface the migration needs: user
//! accounts, tenant namespace names, and candidate RoleBindings. The
//! [`KubeCluster`] implementation talks to the API server through `kube`;
//! tests provide in-memory sources.

use std::path::Path;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Client, Config};
use tracing::{debug, info};

use crate::config::ClusterConfig;
use crate::errors::ClusterError;
use crate::models::AccountRecord;

const USER_ACCOUNT_GROUP: &str = "toolchain.dev.openshift.com";
const USER_ACCOUNT_VERSION: &str = "v1alpha1";
const USER_ACCOUNT_KIND: &str = "UserAccount";
const USER_ACCOUNT_PLURAL: &str = "useraccounts";

/// Source of the records a migration run reads.
#[allow(async_fn_in_trait)]
pub trait ClusterSource {
    /// All `UserAccount`s in the account namespace.
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, ClusterError>;

    /// Names of tenant namespaces.
    async fn list_tenant_namespaces(&self) -> Result<Vec<String>, ClusterError>;

    /// Candidate RoleBindings, with configured exclusions already applied.
    async fn list_bindings(&self) -> Result<Vec<RoleBinding>, ClusterError>;
}

/// [`ClusterSource`] backed by a live API server.
pub struct KubeCluster {
    client: Client,
    config: ClusterConfig,
}

impl KubeCluster {
    /// Build a client from an explicit kubeconfig file.
    pub async fn from_kubeconfig(
        kubeconfig: &Path,
        config: &ClusterConfig,
    ) -> Result<Self, ClusterError> {
        info!(path = %kubeconfig.display(), "loading kubeconfig");
        let kubeconfig_error = |detail: String| ClusterError::KubeconfigError {
            path: kubeconfig.display().to_string(),
            detail,
        };

        let raw = Kubeconfig::read_from(kubeconfig).map_err(|e| kubeconfig_error(e.to_string()))?;
        let client_config = Config::from_custom_kubeconfig(raw, &KubeConfigOptions::default())
            .await
            .map_err(|e| kubeconfig_error(e.to_string()))?;
        debug!(cluster_url = %client_config.cluster_url, "kubeconfig resolved");

        let client =
            Client::try_from(client_config).map_err(|e| ClusterError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

impl ClusterSource for KubeCluster {
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, ClusterError> {
        let gvk = GroupVersionKind::gvk(USER_ACCOUNT_GROUP, USER_ACCOUNT_VERSION, USER_ACCOUNT_KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, USER_ACCOUNT_PLURAL);
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &self.config.account_namespace, &resource);

        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| ClusterError::ListFailed {
                resource: "user accounts",
                source,
            })?;

        let accounts: Vec<AccountRecord> = list
            .items
            .into_iter()
            .map(|object| {
                let spec = object.data.get("spec").cloned();
                AccountRecord::new(object.metadata.name.unwrap_or_default(), spec)
            })
            .collect();

        info!(
            namespace = %self.config.account_namespace,
            count = accounts.len(),
            "listed user accounts"
        );
        Ok(accounts)
    }

    async fn list_tenant_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let params = ListParams::default().labels(&self.config.tenant_namespace_selector);
        let list = api
            .list(&params)
            .await
            .map_err(|source| ClusterError::ListFailed {
                resource: "namespaces",
                source,
            })?;

        let names: Vec<String> = list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect();
        info!(count = names.len(), "listed tenant namespaces");
        Ok(names)
    }

    async fn list_bindings(&self) -> Result<Vec<RoleBinding>, ClusterError> {
        let api: Api<RoleBinding> = Api::all(self.client.clone());
        let params = ListParams::default().labels(&self.config.binding_selector);
        let list = api
            .list(&params)
            .await
            .map_err(|source| ClusterError::ListFailed {
                resource: "tenant RoleBindings",
                source,
            })?;

        let listed = list.items.len();
        let bindings = retain_candidates(list.items, &self.config);
        info!(listed, candidates = bindings.len(), "listed tenant RoleBindings");
        Ok(bindings)
    }
}

/// Drop RoleBindings that must never be migrated: the excluded binding
/// names and everything in the excluded namespaces.
pub fn retain_candidates(bindings: Vec<RoleBinding>, config: &ClusterConfig) -> Vec<RoleBinding> {
    bindings
        .into_iter()
        .filter(|rb| {
            let name = rb.metadata.name.as_deref().unwrap_or_default();
            let namespace = rb.metadata.namespace.as_deref().unwrap_or_default();
            let excluded = config.excluded_binding_names.iter().any(|n| n == name)
                || config.excluded_namespaces.iter().any(|n| n == namespace);
            if excluded {
                debug!(namespace, name, "excluding RoleBinding");
            }
            !excluded
        })
        .collect()
}
