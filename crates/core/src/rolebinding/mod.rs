//! RoleBinding migration: renaming rules, transformation and manifest output.

pub mod manifest;
pub mod rename;
pub mod transformer;

pub use manifest::{render, Manifest};
pub use rename::{replace_first, RenameRules};
pub use transformer::{BindingTransformer, TransformOutcome, CLUSTER_ROLE_KIND};
