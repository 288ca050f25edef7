//! Remote identifier shape checks
//!
//! Identifiers from the remote service end up in URLs and file names, so they
//! are checked before use. This is the only guard against path traversal or
//! URL injection through remote data.

/// Exact length of every remote identifier
pub const ID_LENGTH: usize = 17;

/// Prefix carried by API keys
pub const API_KEY_PREFIX: &str = "key";

/// Prefix carried by attachment identifiers
pub const ATTACHMENT_ID_PREFIX: &str = "att";

/// Check that `s` has the remote identifier shape
///
/// True iff `s` is exactly [`ID_LENGTH`] bytes long and every byte is an ASCII
/// letter or digit.
///
/// # Examples
///
/// ```
/// use tablesnap::id::is_valid_id;
///
/// assert!(is_valid_id("fldpjJ6SlAbLkrapJ"));
/// assert!(!is_valid_id("fldpjJ6Sl/bLkrapJ"));
/// assert!(!is_valid_id("short"));
/// ```
#[must_use]
pub fn is_valid_id(s: &str) -> bool {
    s.len() == ID_LENGTH && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Check that `s` is a valid identifier starting with `prefix`
#[must_use]
pub fn is_valid_prefixed_id(s: &str, prefix: &str) -> bool {
    is_valid_id(s) && s.starts_with(prefix)
}
