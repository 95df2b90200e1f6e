//! Path segment grammar.
//!
//! A path is a `/`-separated list of segments. A segment is `.`, `..`,
//! `name` or `name[n]` where `n >= 1` selects among same-name siblings.

use crate::error::{TypeError, TypeResult};

/// One parsed path segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// `.`
    Current,
    /// `..`
    Parent,
    /// `name` or `name[index]`; a bare name has index 1.
    Name { name: String, index: usize },
}

/// Parse a single segment.
pub fn parse_segment(segment: &str) -> TypeResult<PathSegment> {
    match segment {
        "" => Err(invalid(segment, "empty path segment")),
        "." => Ok(PathSegment::Current),
        ".." => Ok(PathSegment::Parent),
        _ => {
            let Some(open) = segment.find('[') else {
                return Ok(PathSegment::Name {
                    name: segment.to_string(),
                    index: 1,
                });
            };
            let Some(digits) = segment[open + 1..].strip_suffix(']') else {
                return Err(invalid(segment, "unterminated same-name sibling index"));
            };
            let index: usize = digits
                .parse()
                .map_err(|_| invalid(segment, "same-name sibling index must be a number"))?;
            if index < 1 {
                return Err(invalid(segment, "same-name sibling index must be at least 1"));
            }
            let name = &segment[..open];
            if name.is_empty() {
                return Err(invalid(segment, "missing name before index"));
            }
            Ok(PathSegment::Name {
                name: name.to_string(),
                index,
            })
        }
    }
}

/// Split a path into everything before the last segment and the last
/// segment itself.
///
/// `"a/b/c"` gives `("a/b", "c")`, `"/c"` gives `("/", "c")` and `"c"`
/// gives `("", "c")`. A trailing slash is ignored.
pub fn split_last(path: &str) -> (&str, &str) {
    let trimmed = if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    };
    match trimmed.rfind('/') {
        Some(0) => ("/", &trimmed[1..]),
        Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
        None => ("", trimmed),
    }
}

fn invalid(segment: &str, reason: &str) -> TypeError {
    TypeError::InvalidPath {
        segment: segment.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn special_segments() {
        assert_eq!(parse_segment(".").unwrap(), PathSegment::Current);
        assert_eq!(parse_segment("..").unwrap(), PathSegment::Parent);
    }

    #[test]
    fn bare_name_has_index_one() {
        assert_eq!(
            parse_segment("b").unwrap(),
            PathSegment::Name { name: "b".into(), index: 1 }
        );
    }

    #[test]
    fn indexed_name() {
        assert_eq!(
            parse_segment("jcr:content[3]").unwrap(),
            PathSegment::Name { name: "jcr:content".into(), index: 3 }
        );
    }

    #[test]
    fn zero_index_is_rejected() {
        assert!(matches!(
            parse_segment("b[0]"),
            Err(TypeError::InvalidPath { .. })
        ));
    }

    #[test]
    fn malformed_index() {
        assert!(parse_segment("b[").is_err());
        assert!(parse_segment("b[x]").is_err());
        assert!(parse_segment("b[-1]").is_err());
        assert!(parse_segment("[2]").is_err());
        assert!(parse_segment("").is_err());
    }

    #[test]
    fn split_last_forms() {
        assert_eq!(split_last("a/b/c"), ("a/b", "c"));
        assert_eq!(split_last("/c"), ("/", "c"));
        assert_eq!(split_last("c"), ("", "c"));
        assert_eq!(split_last("a/b/"), ("a", "b"));
        assert_eq!(split_last("/a/b"), ("/a", "b"));
    }

    proptest! {
        #[test]
        fn positive_indices_parse(name in "[a-z]{1,10}", index in 1usize..10_000) {
            let seg = format!("{name}[{index}]");
            prop_assert_eq!(
                parse_segment(&seg).unwrap(),
                PathSegment::Name { name, index }
            );
        }
    }
}
