//! Error types for the wscli core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type. Everything in here is fatal to a migration run: recoverable
//! conditions (missing claims, unresolved subjects, duplicates) are logged and
//! counted by the component that meets them and never become errors.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Cluster errors
// ---------------------------------------------------------------------------

/// Errors from loading the kubeconfig and listing cluster resources.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The kubeconfig file could not be read or interpreted.
    #[error("failed to load kubeconfig '{path}': {detail}")]
    KubeconfigError { path: String, detail: String },

    /// The Kubernetes client could not be constructed.
    #[error("failed to create k8s client: {0}")]
    ClientError(String),

    /// A list call against the API server failed.
    #[error("failed to list {resource}: {source}")]
    ListFailed {
        resource: &'static str,
        #[source]
        source: kube::Error,
    },
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

/// Errors from the identity resolution subsystem.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Connecting to (or binding against) the directory server failed.
    #[error("failed to connect to LDAP server '{url}': {detail}")]
    ConnectFailed { url: String, detail: String },

    /// A directory search returned an error.
    #[error("LDAP search for '{value}' by '{attribute}' failed: {detail}")]
    SearchFailed {
        attribute: String,
        value: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Transform errors
// ---------------------------------------------------------------------------

/// Input-integrity violations found while migrating RoleBindings.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A RoleBinding carries more than one subject.
    #[error("RoleBinding {name} in namespace {namespace} has more than one subject ({count})")]
    MultipleSubjects {
        namespace: String,
        name: String,
        count: usize,
    },
}
