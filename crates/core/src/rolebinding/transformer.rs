//! Migration of tenant RoleBindings onto SSO identities and cluster roles.
//!
//! [`BindingTransformer::transform`] is pure: it reads the identity mapping
//! and the candidate RoleBindings and returns fresh objects. Nothing from the
//! source metadata (uid, resourceVersion, timestamps, managed fields,
//! annotations, labels) is carried over.

use std::collections::BTreeMap;

use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, info, warn};

use super::rename::RenameRules;
use crate::config::RenameConfig;
use crate::errors::TransformError;
use crate::models::{IdentityMapping, OrphanReport};

/// Role kind every migrated RoleBinding points at.
pub const CLUSTER_ROLE_KIND: &str = "ClusterRole";

/// Result of transforming one batch of RoleBindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutcome {
    /// Migrated RoleBindings in input order.
    pub migrated: Vec<RoleBinding>,
    /// Namespaces with candidates but no migrated RoleBinding.
    pub orphans: OrphanReport,
    /// Candidates whose subject had no identity mapping.
    pub skipped: usize,
}

/// Rewrites KubeSaw RoleBindings for the SSO identity scheme.
#[derive(Debug, Clone)]
pub struct BindingTransformer {
    rules: RenameRules,
    label_key: String,
    label_value: String,
}

impl BindingTransformer {
    pub fn new(config: &RenameConfig) -> Self {
        Self {
            rules: RenameRules::from_config(config),
            label_key: config.label_key.clone(),
            label_value: config.label_value.clone(),
        }
    }

    /// Migrate every binding whose subject is in `mapping`.
    ///
    /// A binding with more than one subject aborts the whole batch. Bindings
    /// without a mapped subject are skipped and do not count towards their
    /// namespace.
    pub fn transform(
        &self,
        mapping: &IdentityMapping,
        bindings: &[RoleBinding],
    ) -> Result<TransformOutcome, TransformError> {
        let mut per_namespace: BTreeMap<String, usize> = BTreeMap::new();
        let mut outcome = TransformOutcome::default();

        for binding in bindings {
            let namespace = binding.metadata.namespace.clone().unwrap_or_default();
            let name = binding.metadata.name.as_deref().unwrap_or_default();
            let migrated_in_namespace = per_namespace.entry(namespace.clone()).or_insert(0);

            let subjects = binding.subjects.as_deref().unwrap_or_default();
            if subjects.len() > 1 {
                return Err(TransformError::MultipleSubjects {
                    namespace,
                    name: name.to_string(),
                    count: subjects.len(),
                });
            }
            let Some(subject) = subjects.first() else {
                warn!(namespace = %namespace, name, "RoleBinding has no subject, skipping");
                outcome.skipped += 1;
                continue;
            };

            let Some(identity) = mapping.get(&subject.name) else {
                debug!(namespace = %namespace, name, subject = %subject.name, "subject not mapped, skipping");
                outcome.skipped += 1;
                continue;
            };

            outcome
                .migrated
                .push(self.migrate(binding, &namespace, name, subject, identity));
            *migrated_in_namespace += 1;
        }

        outcome.orphans = per_namespace
            .into_iter()
            .filter(|(_, count)| *count == 0)
            .map(|(namespace, _)| namespace)
            .collect();

        info!(
            candidates = bindings.len(),
            migrated = outcome.migrated.len(),
            skipped = outcome.skipped,
            orphans = outcome.orphans.len(),
            "RoleBindings transformed"
        );
        Ok(outcome)
    }

    fn migrate(
        &self,
        binding: &RoleBinding,
        namespace: &str,
        name: &str,
        subject: &Subject,
        identity: &str,
    ) -> RoleBinding {
        let new_name = self.rules.binding_name(name, &subject.name, identity);
        debug!(namespace, from = name, to = %new_name, "migrating RoleBinding");

        RoleBinding {
            metadata: ObjectMeta {
                name: Some(new_name),
                namespace: Some(namespace.to_string()),
                labels: Some(BTreeMap::from([(
                    self.label_key.clone(),
                    self.label_value.clone(),
                )])),
                ..ObjectMeta::default()
            },
            role_ref: RoleRef {
                api_group: binding.role_ref.api_group.clone(),
                kind: CLUSTER_ROLE_KIND.to_string(),
                name: self.rules.role_name(&binding.role_ref.name),
            },
            subjects: Some(vec![Subject {
                name: identity.to_string(),
                ..subject.clone()
            }]),
        }
    }
}
