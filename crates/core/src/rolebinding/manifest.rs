//! Multi-document YAML rendering of migrated RoleBindings.

use std::collections::HashSet;

use k8s_openapi::api::rbac::v1::RoleBinding;
use tracing::{debug, warn};

const DOCUMENT_SEPARATOR: &str = "---\n";
const NULL_TIMESTAMP_BLOCK: &str = "metadata:\n  creationTimestamp: null";

/// Rendered manifest text plus bookkeeping for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub text: String,
    pub written: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Render each RoleBinding as its own YAML document.
///
/// RoleBindings are keyed by `(namespace, name)`; the first one seen wins and
/// later ones are dropped and counted. A binding that fails to serialize is
/// logged and skipped.
pub fn render(bindings: &[RoleBinding]) -> Manifest {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut manifest = Manifest::default();

    for binding in bindings {
        let namespace = binding.metadata.namespace.as_deref().unwrap_or_default();
        let name = binding.metadata.name.as_deref().unwrap_or_default();

        if !seen.insert((namespace, name)) {
            warn!(namespace, name, "RoleBinding was already processed, skipping duplicate");
            manifest.duplicates += 1;
            continue;
        }

        let yaml = match serde_yaml::to_string(binding) {
            Ok(yaml) => yaml,
            Err(e) => {
                warn!(namespace, name, error = %e, "failed to encode RoleBinding to YAML");
                manifest.failed += 1;
                continue;
            }
        };

        manifest.text.push_str(DOCUMENT_SEPARATOR);
        manifest.text.push_str(&strip_null_timestamp(&yaml));
        manifest.written += 1;
        debug!(namespace, name, "rendered RoleBinding");
    }

    manifest
}

/// Collapse a `creationTimestamp: null` placeholder into a bare `metadata:`
/// block.
pub fn strip_null_timestamp(document: &str) -> String {
    document.replacen(NULL_TIMESTAMP_BLOCK, "metadata:", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenameConfig;
    use crate::rolebinding::transformer::tests::binding;
    use crate::rolebinding::BindingTransformer;

    fn migrated(pairs: &[(&str, &str, &str)]) -> Vec<RoleBinding> {
        let bindings: Vec<_> = pairs
            .iter()
            .map(|(ns, name, subject)| binding(ns, name, &[*subject], "appstudio-user"))
            .collect();
        let mapping = pairs
            .iter()
            .map(|(_, _, subject)| (subject.to_string(), format!("{subject}@redhat.com")))
            .collect();
        BindingTransformer::new(&RenameConfig::default())
            .transform(&mapping, &bindings)
            .unwrap()
            .migrated
    }

    #[test]
    fn test_render_documents() {
        let manifest = render(&migrated(&[
            ("team-a", "appstudio-user-jdoe", "jdoe"),
            ("team-b", "appstudio-user-alice", "alice"),
        ]));

        assert_eq!(manifest.written, 2);
        assert_eq!(manifest.duplicates, 0);
        assert_eq!(manifest.text.matches("---\n").count(), 2);
        assert!(manifest.text.starts_with("---\napiVersion: rbac.authorization.k8s.io/v1\n"));
        assert!(manifest.text.contains("kind: RoleBinding\n"));
        assert!(manifest.text.contains("kind: ClusterRole\n"));
        assert!(manifest.text.contains("name: konflux-user-jdoe@redhat.com\n"));
        assert!(manifest.text.contains("konflux-ci.dev/type: user\n"));
        assert!(!manifest.text.contains("creationTimestamp"));
        assert!(!manifest.text.contains("resourceVersion"));
        assert!(!manifest.text.contains("uid:"));
    }

    #[test]
    fn test_documents_parse_back() {
        let manifest = render(&migrated(&[("team-a", "appstudio-user-jdoe", "jdoe")]));
        let doc = manifest.text.trim_start_matches("---\n");
        let parsed: RoleBinding = serde_yaml::from_str(doc).unwrap();
        assert_eq!(parsed.metadata.name.as_deref(), Some("konflux-user-jdoe@redhat.com"));
        assert_eq!(parsed.subjects.unwrap()[0].name, "jdoe@redhat.com");
    }

    #[test]
    fn test_duplicates_first_wins() {
        let mut bindings = migrated(&[("team-a", "appstudio-user-jdoe", "jdoe")]);
        let mut later = bindings[0].clone();
        later.role_ref.name = "konflux-admin".into();
        bindings.push(later);

        let manifest = render(&bindings);
        assert_eq!(manifest.written, 1);
        assert_eq!(manifest.duplicates, 1);
        assert!(manifest.text.contains("name: konflux-user\n"));
        assert!(!manifest.text.contains("konflux-admin"));
    }

    #[test]
    fn test_same_name_other_namespace_is_kept() {
        let manifest = render(&migrated(&[
            ("team-a", "appstudio-user-jdoe", "jdoe"),
            ("team-b", "appstudio-user-jdoe", "jdoe"),
        ]));
        assert_eq!(manifest.written, 2);
        assert_eq!(manifest.duplicates, 0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render(&[]), Manifest::default());
    }

    #[test]
    fn test_strip_null_timestamp() {
        let doc = "kind: RoleBinding\nmetadata:\n  creationTimestamp: null\n  name: x\n";
        assert_eq!(
            strip_null_timestamp(doc),
            "kind: RoleBinding\nmetadata:\n  name: x\n"
        );
        let clean = "metadata:\n  name: x\n";
        assert_eq!(strip_null_timestamp(clean), clean);
    }
}
