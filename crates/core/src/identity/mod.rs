//! Identity resolution for migrating KubeSaw accounts to SSO identities.
//!
//! Two strategies are supported:
//! 1. Deterministic: the account's email with any `+tag` sub-address removed
//! 2. Directory: the short `uid` found in LDAP by mail, then by preferred alias

pub mod address;
pub mod directory;
pub mod ldap;
pub mod mapper;

pub use address::clean_email;
pub use directory::{DirectoryLookup, DirectorySearch};
pub use ldap::LdapSession;
pub use mapper::{IdentityResolver, Resolution, Transform, Unmapped, UnmappedReason};
