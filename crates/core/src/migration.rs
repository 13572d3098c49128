//! Migration run orchestration.
//!
//! A run is strictly sequential and fail-fast:
//!
//! 1. List user accounts and build the identity mapping.
//! 2. List tenant namespaces.
//! 3. List candidate RoleBindings.
//! 4. Transform them and detect orphan namespaces.
//! 5. Render the deduplicated manifest.
//!
//! Nothing is persisted between runs; after a fatal error the whole run is
//! simply repeated.

use std::collections::BTreeSet;

use tracing::info;

use crate::cluster::ClusterSource;
use crate::config::RenameConfig;
use crate::errors::CoreError;
use crate::identity::{DirectorySearch, IdentityResolver, Resolution};
use crate::models::MigrationSummary;
use crate::rolebinding::{render, BindingTransformer, Manifest};

/// Everything a run produces: the manifest to write and the counts to report.
#[derive(Debug, Clone)]
pub struct MigrationOutput {
    pub manifest: Manifest,
    pub resolution: Resolution,
    pub summary: MigrationSummary,
}

/// Sequences the cluster source, identity resolver, and transformer.
pub struct Migrator<'a, C> {
    cluster: &'a C,
    transformer: BindingTransformer,
}

impl<'a, C: ClusterSource> Migrator<'a, C> {
    pub fn new(cluster: &'a C, rename: &RenameConfig) -> Self {
        Self {
            cluster,
            transformer: BindingTransformer::new(rename),
        }
    }

    /// Execute one full migration run.
    ///
    /// Recoverable conditions are counted in the summary; any listing,
    /// directory, or integrity failure aborts the run with no output.
    pub async fn run<S: DirectorySearch>(
        &self,
        resolver: &mut IdentityResolver<S>,
    ) -> Result<MigrationOutput, CoreError> {
        let mut summary = MigrationSummary::default();

        let accounts = self.cluster.list_accounts().await?;
        summary.accounts = accounts.len();

        let resolution = resolver.build_mapping(&accounts).await?;
        summary.mapped_accounts = resolution.mapping.len();
        summary.unmapped_accounts = resolution.unmapped.len();

        let tenant_namespaces = self.cluster.list_tenant_namespaces().await?;
        summary.tenant_namespaces = tenant_namespaces.len();

        let bindings = self.cluster.list_bindings().await?;
        summary.candidate_bindings = bindings.len();

        let with_bindings: BTreeSet<&str> = bindings
            .iter()
            .filter_map(|rb| rb.metadata.namespace.as_deref())
            .collect();
        let mut without_bindings: Vec<String> = tenant_namespaces
            .into_iter()
            .filter(|ns| !with_bindings.contains(ns.as_str()))
            .collect();
        without_bindings.sort();
        summary.namespaces_without_bindings = without_bindings;

        let outcome = self.transformer.transform(&resolution.mapping, &bindings)?;
        summary.migrated_bindings = outcome.migrated.len();
        summary.skipped_bindings = outcome.skipped;
        summary.orphans = outcome.orphans.into_iter().collect();

        let manifest = render(&outcome.migrated);
        summary.duplicates = manifest.duplicates;
        summary.failed = manifest.failed;
        summary.written = manifest.written;

        info!(
            accounts = summary.accounts,
            mapped = summary.mapped_accounts,
            migrated = summary.migrated_bindings,
            written = summary.written,
            failed = summary.failed,
            orphans = summary.orphans.len(),
            "migration run complete"
        );

        Ok(MigrationOutput {
            manifest,
            resolution,
            summary,
        })
    }
}
