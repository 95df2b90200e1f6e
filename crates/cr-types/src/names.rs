//! JCR name validation.
//!
//! A name is `local` or `prefix:local`. Only the local part is checked
//! against the grammar here; whether a prefix is registered is a session
//! concern. Local name rules:
//!
//! - Must be non-empty
//! - Must not contain `/`, `:`, `[`, `]`, `|` or `*`
//! - One character: not `.`, not whitespace
//! - Two characters: each either `.` or a valid one-character name, but not `..`
//! - Three or more: no leading or trailing space, and no whitespace other
//!   than the plain space in between
//!
//! Extended names of the form `{uri}local` are not supported.

use crate::error::{TypeError, TypeResult};

/// Characters that are forbidden anywhere in a local name.
const FORBIDDEN_CHARS: &[char] = &['/', ':', '[', ']', '|', '*'];

/// Validate a (possibly prefixed) item name.
///
/// # Examples
///
/// ```
/// use cr_types::names::validate_name;
///
/// assert!(validate_name("content").is_ok());
/// assert!(validate_name("jcr:content").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("a:b:c").is_err());
/// ```
pub fn validate_name(name: &str) -> TypeResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }
    if name.starts_with('{') {
        return Err(invalid(name, "extended names are not supported"));
    }
    let (_, local) = split_prefixed_name(name);
    validate_local_name(local).map_err(|reason| invalid(name, reason))
}

/// Boolean form of [`validate_name`].
pub fn is_valid_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

/// Split `prefix:local` at the first colon.
///
/// A name without a colon has no prefix. The local part may itself still
/// contain colons, which [`validate_name`] rejects.
pub fn split_prefixed_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn validate_local_name(local: &str) -> Result<(), &'static str> {
    let chars: Vec<char> = local.chars().collect();
    match chars.as_slice() {
        [] => Err("local name must not be empty"),
        [c] => {
            if is_one_char_name(*c) {
                Ok(())
            } else {
                Err("single character name must not be '.', whitespace or a reserved character")
            }
        }
        [a, b] => {
            if *a == '.' && *b == '.' {
                return Err("'..' is reserved");
            }
            if (*a == '.' || is_one_char_name(*a)) && (*b == '.' || is_one_char_name(*b)) {
                Ok(())
            } else {
                Err("contains whitespace or a reserved character")
            }
        }
        [first, middle @ .., last] => {
            if !is_non_space(*first) || !is_non_space(*last) {
                return Err("must not start or end with whitespace or a reserved character");
            }
            if middle.iter().all(|c| *c == ' ' || is_non_space(*c)) {
                Ok(())
            } else {
                Err("contains whitespace other than space or a reserved character")
            }
        }
    }
}

fn is_non_space(c: char) -> bool {
    !c.is_whitespace() && !FORBIDDEN_CHARS.contains(&c)
}

fn is_one_char_name(c: char) -> bool {
    c != '.' && is_non_space(c)
}

fn invalid(name: &str, reason: &str) -> TypeError {
    TypeError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_names() {
        assert!(is_valid_name("a"));
        assert!(is_valid_name("content"));
        assert!(is_valid_name("news item"));
        assert!(is_valid_name("with.dots"));
        assert!(is_valid_name("..."));
    }

    #[test]
    fn prefixed_names() {
        assert!(is_valid_name("jcr:content"));
        assert!(is_valid_name("nt:unstructured"));
        assert!(!is_valid_name("jcr:"));
        assert!(!is_valid_name("a:b:c"));
    }

    #[test]
    fn empty_and_extended() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("{http://example.org}name"));
    }

    #[test]
    fn single_char_rules() {
        assert!(!is_valid_name("."));
        assert!(!is_valid_name(" "));
        assert!(!is_valid_name("*"));
        assert!(is_valid_name("x"));
    }

    #[test]
    fn two_char_rules() {
        assert!(!is_valid_name(".."));
        assert!(is_valid_name(".a"));
        assert!(is_valid_name("a."));
        assert!(is_valid_name("ab"));
        assert!(!is_valid_name("a "));
        assert!(!is_valid_name("a|"));
    }

    #[test]
    fn three_or_more_rules() {
        assert!(!is_valid_name(" ab"));
        assert!(!is_valid_name("ab "));
        assert!(!is_valid_name("a\tb"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a[1]"));
        assert!(!is_valid_name("a|b"));
        assert!(!is_valid_name("a*b"));
    }

    #[test]
    fn split_prefix() {
        assert_eq!(split_prefixed_name("jcr:uuid"), (Some("jcr"), "uuid"));
        assert_eq!(split_prefixed_name("uuid"), (None, "uuid"));
        assert_eq!(split_prefixed_name("a:b:c"), (Some("a"), "b:c"));
    }

    #[test]
    fn error_carries_reason() {
        match validate_name("..") {
            Err(TypeError::InvalidName { name, reason }) => {
                assert_eq!(name, "..");
                assert!(reason.contains("reserved"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn alphanumeric_names_are_valid(name in "[a-zA-Z0-9_]{1,24}") {
            prop_assert!(is_valid_name(&name));
        }

        #[test]
        fn names_with_slash_are_invalid(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let name = format!("{a}/{b}");
            prop_assert!(!is_valid_name(&name));
        }
    }
}
