//! Semantic version ordering used by every discovery backend.

use std::cmp::Ordering;

use semver::Version;

/// A version string that is not a semantic version.
#[derive(Debug, thiserror::Error)]
#[error("invalid semantic version {version:?}")]
pub struct VersionError {
    pub version: String,
    #[source]
    pub source: semver::Error,
}

/// Parse `raw` as a semantic version. A leading `v` is accepted.
pub fn parse_version(raw: &str) -> Result<Version, VersionError> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).map_err(|source| VersionError {
        version: raw.to_string(),
        source,
    })
}

/// Compare two version strings by semantic version precedence.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, VersionError> {
    Ok(parse_version(a)?.cmp_precedence(&parse_version(b)?))
}

/// Sort `versions` ascending and drop entries naming the same version.
///
/// Fails on the first malformed entry rather than skipping it.
pub fn sort_versions<S: AsRef<str>>(versions: &[S]) -> Result<Vec<String>, VersionError> {
    let mut parsed = versions
        .iter()
        .map(|v| parse_version(v.as_ref()).map(|parsed| (parsed, v.as_ref().to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    parsed.sort_by(|(a, _), (b, _)| a.cmp_precedence(b));
    parsed.dedup_by(|(a, _), (b, _)| a.cmp_precedence(b) == Ordering::Equal);
    Ok(parsed.into_iter().map(|(_, raw)| raw).collect())
}

/// Highest version in `versions`, ignoring malformed entries.
pub fn latest_version<S: AsRef<str>>(versions: &[S]) -> Option<&str> {
    versions
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|v| parse_version(v).ok().map(|parsed| (parsed, v)))
        .max_by(|(a, _), (b, _)| a.cmp_precedence(b))
        .map(|(_, raw)| raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn test_sort_dedups_and_orders() {
        let sorted = sort_versions(&["v1.2.0", "v1.0.0", "v1.2.0"]).unwrap();
        assert_eq!(sorted, vec!["v1.0.0", "v1.2.0"]);
    }

    #[test]
    fn test_sort_uses_semver_not_lexical_order() {
        let sorted = sort_versions(&["v1.10.0", "v1.9.0", "v1.9.0-rc.1", "v0.28.1"]).unwrap();
        assert_eq!(sorted, vec!["v0.28.1", "v1.9.0-rc.1", "v1.9.0", "v1.10.0"]);
    }

    #[test]
    fn test_sort_rejects_malformed() {
        let err = sort_versions(&["v1.0.0", "latest"]).unwrap_err();
        assert_eq!(err.version, "latest");
    }

    #[test]
    fn test_sort_empty() {
        assert!(sort_versions::<&str>(&[]).unwrap().is_empty());
    }

    #[rstest]
    #[case("v1.0.0", "v1.0.1", Ordering::Less)]
    #[case("1.2.0", "v1.2.0", Ordering::Equal)]
    #[case("v2.0.0", "v2.0.0-alpha.1", Ordering::Greater)]
    fn test_compare_versions(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(compare_versions(a, b).unwrap(), expected);
    }

    #[test]
    fn test_latest_version() {
        assert_eq!(latest_version(&["v1.0.0", "bogus", "v1.3.0"]), Some("v1.3.0"));
        assert_eq!(latest_version::<&str>(&[]), None);
    }
}
