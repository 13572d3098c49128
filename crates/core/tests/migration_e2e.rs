//! End-to-end tests for a full migration run.
//!
//! These tests drive the real `Migrator` with:
//! - An in-memory cluster source (accounts, namespaces, RoleBindings)
//! - An in-memory directory standing in for LDAP
//!
//! No network I/O.

use std::collections::{BTreeMap, HashMap};

use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::json;

use wscli_core::cluster::{retain_candidates, ClusterSource};
use wscli_core::config::{ClusterConfig, DirectoryConfig, MigrationConfig};
use wscli_core::errors::{ClusterError, CoreError, IdentityError, TransformError};
use wscli_core::identity::{DirectoryLookup, DirectorySearch, IdentityResolver, Transform};
use wscli_core::models::AccountRecord;
use wscli_core::Migrator;

// ===========================================================================
// Helpers
// ===========================================================================

#[derive(Default)]
struct MemoryCluster {
    accounts: Vec<AccountRecord>,
    namespaces: Vec<String>,
    bindings: Vec<RoleBinding>,
    config: ClusterConfig,
}

impl ClusterSource for MemoryCluster {
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, ClusterError> {
        Ok(self.accounts.clone())
    }

    async fn list_tenant_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        Ok(self.namespaces.clone())
    }

    async fn list_bindings(&self) -> Result<Vec<RoleBinding>, ClusterError> {
        Ok(retain_candidates(self.bindings.clone(), &self.config))
    }
}

#[derive(Default)]
struct MemoryDirectory {
    by_attribute: HashMap<(String, String), String>,
    searches: usize,
}

impl MemoryDirectory {
    fn entry(mut self, attribute: &str, value: &str, uid: &str) -> Self {
        self.by_attribute
            .insert((attribute.into(), value.into()), uid.into());
        self
    }
}

impl DirectorySearch for MemoryDirectory {
    async fn first_value(
        &mut self,
        filter_attribute: &str,
        value: &str,
        _wanted_attribute: &str,
    ) -> Result<Option<String>, IdentityError> {
        self.searches += 1;
        Ok(self
            .by_attribute
            .get(&(filter_attribute.to_string(), value.to_string()))
            .cloned())
    }
}

fn account(name: &str, email: &str) -> AccountRecord {
    AccountRecord::new(name, Some(json!({"propagatedClaims": {"email": email}})))
}

fn binding(namespace: &str, name: &str, subjects: &[&str], role: &str) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            resource_version: Some("42".into()),
            uid: Some("c0ffee".into()),
            annotations: Some(BTreeMap::from([("a".to_string(), "b".to_string())])),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".into(),
            kind: "Role".into(),
            name: role.into(),
        },
        subjects: Some(
            subjects
                .iter()
                .map(|s| Subject {
                    api_group: Some("rbac.authorization.k8s.io".into()),
                    kind: "User".into(),
                    name: s.to_string(),
                    namespace: None,
                })
                .collect(),
        ),
    }
}

fn sample_cluster() -> MemoryCluster {
    MemoryCluster {
        accounts: vec![
            account("jdoe", "jdoe+dev@redhat.com"),
            account("alice", "alice@redhat.com"),
            AccountRecord::new("broken", Some(json!({"propagatedClaims": {}}))),
        ],
        namespaces: vec![
            "jdoe-tenant".into(),
            "alice-tenant".into(),
            "ghost-tenant".into(),
            "empty-tenant".into(),
        ],
        bindings: vec![
            binding(
                "jdoe-tenant",
                "appstudio-pipelines-runner-rolebinding-alt",
                &["jdoe"],
                "appstudio-user",
            ),
            binding("jdoe-tenant", "appstudio-pipelines-runner-rolebinding", &["jdoe"], "x"),
            binding("jdoe-tenant", "appstudio-admin-jdoe", &["jdoe"], "appstudio-admin"),
            binding("alice-tenant", "appstudio-user-alice", &["alice"], "appstudio-user"),
            binding("ghost-tenant", "appstudio-user-ghost", &["ghost"], "appstudio-user"),
            binding("toolchain-host-operator", "appstudio-user-jdoe", &["jdoe"], "appstudio-user"),
        ],
        config: ClusterConfig::default(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_email_strategy_full_run() {
    let cluster = sample_cluster();
    let config = MigrationConfig::default();
    let migrator = Migrator::new(&cluster, &config.rename);
    let mut resolver: IdentityResolver<MemoryDirectory> =
        IdentityResolver::new(Transform::Deterministic);

    let output = migrator.run(&mut resolver).await.unwrap();
    let summary = &output.summary;

    assert_eq!(summary.accounts, 3);
    assert_eq!(summary.mapped_accounts, 2);
    assert_eq!(summary.unmapped_accounts, 1);
    assert_eq!(summary.tenant_namespaces, 4);
    assert_eq!(summary.namespaces_without_bindings, vec!["empty-tenant"]);
    assert_eq!(summary.candidate_bindings, 4);
    assert_eq!(summary.migrated_bindings, 3);
    assert_eq!(summary.skipped_bindings, 1);
    assert_eq!(summary.written, 3);
    assert_eq!(summary.duplicates, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.orphans, vec!["ghost-tenant"]);

    let text = &output.manifest.text;
    assert!(text.contains("name: konflux-pipelines-runner-rolebinding-alt\n"));
    assert!(text.contains("name: konflux-admin-jdoe@redhat.com\n"));
    assert!(text.contains("name: jdoe@redhat.com\n"));
    assert!(text.contains("name: konflux-user\n"));
    assert!(!text.contains("appstudio"));
    assert!(!text.contains("toolchain-host-operator"));
    assert!(!text.contains("resourceVersion"));
    assert!(!text.contains("annotations"));
}

#[tokio::test]
async fn test_user_strategy_full_run() {
    let cluster = sample_cluster();
    let config = MigrationConfig::default();
    let directory = MemoryDirectory::default()
        .entry("mail", "jdoe@redhat.com", "jdoe")
        .entry("rhatPreferredAlias", "alice@redhat.com", "asmith");
    let lookup = DirectoryLookup::new(directory, &DirectoryConfig::default());
    let mut resolver = IdentityResolver::new(Transform::Directory(lookup));

    let output = Migrator::new(&cluster, &config.rename)
        .run(&mut resolver)
        .await
        .unwrap();

    assert_eq!(output.resolution.mapping.get("jdoe").map(String::as_str), Some("jdoe"));
    assert_eq!(output.resolution.mapping.get("alice").map(String::as_str), Some("asmith"));
    assert!(output.manifest.text.contains("name: konflux-user-asmith\n"));
    assert_eq!(output.summary.orphans, vec!["ghost-tenant"]);

    // jdoe: one search; alice: mail miss then alias hit.
    let directory = resolver.into_directory().unwrap();
    assert_eq!(directory.searches, 3);
}

#[tokio::test]
async fn test_multi_subject_binding_aborts_run() {
    let mut cluster = sample_cluster();
    cluster.bindings.push(binding(
        "alice-tenant",
        "appstudio-shared",
        &["alice", "jdoe"],
        "appstudio-user",
    ));
    let config = MigrationConfig::default();
    let mut resolver: IdentityResolver<MemoryDirectory> =
        IdentityResolver::new(Transform::Deterministic);

    let result = Migrator::new(&cluster, &config.rename)
        .run(&mut resolver)
        .await;
    assert!(matches!(
        result,
        Err(CoreError::Transform(TransformError::MultipleSubjects { .. }))
    ));
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let cluster = sample_cluster();
    let config = MigrationConfig::default();
    let migrator = Migrator::new(&cluster, &config.rename);

    let mut first_resolver: IdentityResolver<MemoryDirectory> =
        IdentityResolver::new(Transform::Deterministic);
    let mut second_resolver: IdentityResolver<MemoryDirectory> =
        IdentityResolver::new(Transform::Deterministic);
    let first = migrator.run(&mut first_resolver).await.unwrap();
    let second = migrator.run(&mut second_resolver).await.unwrap();

    assert_eq!(first.manifest, second.manifest);
    assert_eq!(first.summary, second.summary);
}

#[tokio::test]
async fn test_duplicate_migrated_names_are_written_once() {
    // Two legacy bindings that collapse to the same migrated name.
    let cluster = MemoryCluster {
        accounts: vec![account("jdoe", "jdoe@redhat.com")],
        namespaces: vec!["jdoe-tenant".into()],
        bindings: vec![
            binding("jdoe-tenant", "appstudio-user-jdoe", &["jdoe"], "appstudio-user"),
            binding("jdoe-tenant", "konflux-user-jdoe", &["jdoe"], "appstudio-admin"),
        ],
        config: ClusterConfig::default(),
    };
    let config = MigrationConfig::default();
    let mut resolver: IdentityResolver<MemoryDirectory> =
        IdentityResolver::new(Transform::Deterministic);

    let output = Migrator::new(&cluster, &config.rename)
        .run(&mut resolver)
        .await
        .unwrap();

    assert_eq!(output.summary.migrated_bindings, 2);
    assert_eq!(output.summary.written, 1);
    assert_eq!(output.summary.duplicates, 1);
    assert_eq!(output.summary.failed, output.manifest.failed);
    assert!(output.manifest.text.contains("name: konflux-user\n"));
    assert!(!output.manifest.text.contains("konflux-admin"));
}
