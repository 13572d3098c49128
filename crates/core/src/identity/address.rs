//! Email address normalization.

use std::sync::LazyLock;

use regex_lite::Regex;

/// `+tag` sub-address immediately before the domain separator.
static SUB_ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+[^@]+@").expect("sub-address pattern is valid"));

/// Strip a `+tag` sub-address so aliased addresses collapse onto the
/// canonical mailbox: `jdoe+dev@redhat.com` becomes `jdoe@redhat.com`.
///
/// Idempotent. Addresses without a tag are returned unchanged.
pub fn clean_email(email: &str) -> String {
    SUB_ADDRESS_RE.replace_all(email, "@").into_owned()
}
