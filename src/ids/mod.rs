//! Composite resource IDs.
//!
//! Resources that live under a repository or team are identified by
//! colon-joined parts (`repo:branch`, `teamId:username`).

use crate::errors::{ProviderError, ProviderResult};

/// Separator between ID parts.
pub const ID_SEPARATOR: char = ':';

/// Builds `a:b`.
pub fn build_two_part_id(a: &str, b: &str) -> String {
    format!("{}{}{}", a, ID_SEPARATOR, b)
}

/// Splits `a:b`. Both parts must be non-empty and there must be exactly one
/// separator.
pub fn parse_two_part_id<'i>(
    id: &'i str,
    expected: &'static str,
) -> ProviderResult<(&'i str, &'i str)> {
    let mut parts = id.split(ID_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) if !a.is_empty() && !b.is_empty() => Ok((a, b)),
        _ => Err(invalid(id, expected)),
    }
}

/// Builds `a:b:c`.
pub fn build_three_part_id(a: &str, b: &str, c: &str) -> String {
    format!("{a}{sep}{b}{sep}{c}", sep = ID_SEPARATOR)
}

/// Splits `a:b:c`.
pub fn parse_three_part_id<'i>(
    id: &'i str,
    expected: &'static str,
) -> ProviderResult<(&'i str, &'i str, &'i str)> {
    let parts: Vec<&str> = id.split(ID_SEPARATOR).collect();
    match parts.as_slice() {
        [a, b, c] if !a.is_empty() && !b.is_empty() && !c.is_empty() => Ok((a, b, c)),
        _ => Err(invalid(id, expected)),
    }
}

/// Splits an import ID of the form `repo/rest`, where `rest` may itself
/// contain slashes (file paths).
pub fn parse_import_id<'i>(
    id: &'i str,
    expected: &'static str,
) -> ProviderResult<(&'i str, &'i str)> {
    match id.split_once('/') {
        Some((repo, rest)) if !repo.is_empty() && !rest.is_empty() => Ok((repo, rest)),
        _ => Err(invalid(id, expected)),
    }
}

/// Parses a numeric ID part.
pub fn parse_u64(value: &str, id: &str, expected: &'static str) -> ProviderResult<u64> {
    value.parse().map_err(|_| invalid(id, expected))
}

fn invalid(id: &str, expected: &'static str) -> ProviderError {
    ProviderError::InvalidId {
        id: id.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_two_part_id() {
        let id = build_two_part_id("repo", "main");
        assert_eq!(id, "repo:main");
        assert_eq!(parse_two_part_id(&id, "repo:branch").unwrap(), ("repo", "main"));
    }

    #[test_case("repo" ; "missing separator")]
    #[test_case("repo:" ; "empty second part")]
    #[test_case(":main" ; "empty first part")]
    #[test_case("a:b:c" ; "too many parts")]
    fn test_two_part_id_rejects(id: &str) {
        let err = parse_two_part_id(id, "repo:branch").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidId { .. }));
        assert!(err.to_string().contains("repo:branch"));
    }

    #[test]
    fn test_three_part_id() {
        let id = build_three_part_id("acme", "repo", "7");
        assert_eq!(parse_three_part_id(&id, "o:r:n").unwrap(), ("acme", "repo", "7"));
        assert!(parse_three_part_id("acme:repo", "o:r:n").is_err());
    }

    #[test]
    fn test_import_id_keeps_nested_path() {
        assert_eq!(
            parse_import_id("repo/.github/CODEOWNERS", "repo/path").unwrap(),
            ("repo", ".github/CODEOWNERS")
        );
        assert!(parse_import_id("repo", "repo/path").is_err());
        assert!(parse_import_id("/x", "repo/path").is_err());
    }

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("42", "t:42", "team:user").unwrap(), 42);
        assert!(parse_u64("abc", "abc:u", "team:user").is_err());
    }
}
