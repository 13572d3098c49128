//! wscli core library.
//!
//! Migrates tenant RoleBindings on a KubeSaw member cluster from legacy
//! account names to SSO identities: configuration, cluster access, identity
//! resolution (deterministic or LDAP-backed), RoleBinding transformation, and
//! manifest rendering.

pub mod cluster;
pub mod config;
pub mod errors;
pub mod identity;
pub mod migration;
pub mod models;
pub mod rolebinding;

// Re-exports for convenience.
pub use cluster::{ClusterSource, KubeCluster};
pub use config::MigrationConfig;
pub use identity::IdentityResolver;
pub use migration::Migrator;
