//! Ref and remote name validation.
//!
//! A ref name is a `/`-separated path (`os/x86_64/stable`). It must be
//! non-empty, contain no whitespace or any of `~ ^ : ? * [ \`, contain no
//! `..` or `@{`, have no empty component or component starting with `.`, and
//! must not end with `.lock`.
//!
//! A remote name is a single component using the same character rules.

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// First rule `name` breaks, if any.
fn ref_name_violation(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("must not be empty".into());
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return Some(format!("contains forbidden character {ch:?}"));
    }
    for seq in ["..", "@{"] {
        if name.contains(seq) {
            return Some(format!("must not contain {seq:?}"));
        }
    }
    if name.ends_with(".lock") {
        return Some("must not end with \".lock\"".into());
    }
    if name.ends_with('.') {
        return Some("must not end with '.'".into());
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Some("must not have empty path components".into());
        }
        if component.starts_with('.') {
            return Some(format!("component {component:?} starts with '.'"));
        }
    }
    None
}

/// Validate a ref name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use strata_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("main").is_ok());
/// assert!(validate_ref_name("os/x86_64/stable").is_ok());
/// assert!(validate_ref_name("").is_err());
/// assert!(validate_ref_name("bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    match ref_name_violation(name) {
        None => Ok(()),
        Some(reason) => Err(RefError::InvalidRefName {
            name: name.to_string(),
            reason,
        }),
    }
}

/// Validate a remote name: a ref name with exactly one component.
pub fn validate_remote_name(name: &str) -> Result<()> {
    let reason = if name.contains('/') {
        Some("must not contain '/'".to_string())
    } else {
        ref_name_violation(name)
    };
    match reason {
        None => Ok(()),
        Some(reason) => Err(RefError::InvalidRemoteName {
            name: name.to_string(),
            reason,
        }),
    }
}
