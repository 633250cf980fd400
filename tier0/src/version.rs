//! Semantic version type for cascade definitions.
//!
//! Definitions are versioned at deploy time and immutable thereafter;
//! version comparison decides which definition a constraint resolves to.
//! Precedence follows semver: numeric triple, then a prerelease sorts
//! below the same release, prerelease identifiers compare dot-by-dot
//! (numeric numerically, alphanumeric lexically, numeric < alphanumeric).
//! Build metadata is carried through `Display` but ignored by comparison.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::VersionError;

/// One dot-separated prerelease identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// All-digit identifier, compared numerically.
    Numeric(u64),
    /// Identifier with at least one non-digit, compared lexically.
    AlphaNumeric(String),
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Identifier::Numeric(a), Identifier::Numeric(b)) => a.cmp(b),
            (Identifier::AlphaNumeric(a), Identifier::AlphaNumeric(b)) => a.cmp(b),
            // Numeric identifiers always have lower precedence.
            (Identifier::Numeric(_), Identifier::AlphaNumeric(_)) => Ordering::Less,
            (Identifier::AlphaNumeric(_), Identifier::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{n}"),
            Identifier::AlphaNumeric(s) => f.write_str(s),
        }
    }
}

/// A `MAJOR.MINOR.PATCH[-PRE][+BUILD]` semantic version.
///
/// Serializes as its string form. Equality and ordering ignore build
/// metadata, per semver.
///
/// # Examples
///
/// ```
/// use tier0::Version;
///
/// let a: Version = "1.2.0-rc.1".parse().unwrap();
/// let b: Version = "1.2.0".parse().unwrap();
/// assert!(a < b);
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Prerelease identifiers; empty for a release version.
    pub pre: Vec<Identifier>,
    /// Build metadata, ignored in comparison.
    pub build: Option<String>,
}

impl Version {
    /// Create a release version with no prerelease or build parts.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: vec![],
            build: None,
        }
    }

    /// Parse from a string. Alias for the `FromStr` impl.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        s.parse()
    }

    fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core()
            .cmp(&other.core())
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // A prerelease sorts below the same release.
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            let pre: Vec<String> = self.pre.iter().map(Identifier::to_string).collect();
            write!(f, "-{}", pre.join("."))?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

fn parse_identifier(s: &str) -> Result<Identifier, VersionError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(VersionError::Invalid(s.to_owned()));
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        s.parse()
            .map(Identifier::Numeric)
            .map_err(|_| VersionError::Invalid(s.to_owned()))
    } else {
        Ok(Identifier::AlphaNumeric(s.to_owned()))
    }
}

fn parse_component(s: &str) -> Result<u64, VersionError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(VersionError::Invalid(s.to_owned()));
    }
    s.parse().map_err(|_| VersionError::Invalid(s.to_owned()))
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::Invalid(s.to_owned());

        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) if !build.is_empty() => (rest, Some(build.to_owned())),
            Some(_) => return Err(invalid()),
            None => (s, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre)),
            Some(_) => return Err(invalid()),
            None => (rest, None),
        };

        let mut parts = core.split('.');
        let major = parse_component(parts.next().ok_or_else(invalid)?)?;
        let minor = parse_component(parts.next().ok_or_else(invalid)?)?;
        let patch = parse_component(parts.next().ok_or_else(invalid)?)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let pre = match pre {
            Some(pre) => pre
                .split('.')
                .map(parse_identifier)
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![],
        };

        Ok(Version {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn numeric_triple_ordering() {
        assert!(v("1.0.0") < v("2.0.0"));
        assert!(v("2.0.0") < v("2.1.0"));
        assert!(v("2.1.0") < v("2.1.1"));
    }

    #[test]
    fn prerelease_sorts_below_release() {
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0") > v("1.0.0-rc.9"));
    }

    #[test]
    fn prerelease_identifier_ordering() {
        // The semver.org §11 chain.
        let chain = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in chain.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn numeric_below_alphanumeric() {
        assert!(v("1.0.0-1") < v("1.0.0-a"));
        assert!(v("1.0.0-9999") < v("1.0.0-0a"));
    }

    #[test]
    fn build_metadata_ignored() {
        assert_eq!(v("1.0.0+build.5"), v("1.0.0+other"));
        assert_eq!(v("1.0.0+build.5").cmp(&v("1.0.0")), Ordering::Equal);
    }

    #[test]
    fn display_preserves_all_parts() {
        for s in ["1.2.3", "1.2.3-rc.1", "1.2.3+build", "1.2.3-rc.1+build.7"] {
            assert_eq!(v(s).to_string(), s);
        }
    }

    #[test]
    fn malformed_versions_rejected() {
        for s in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1.2.3-", "1.2.3+", "1..3"] {
            assert!(s.parse::<Version>().is_err(), "accepted {s:?}");
        }
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&v("1.2.3-rc.1")).unwrap();
        assert_eq!(json, "\"1.2.3-rc.1\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2.3-rc.1"));
    }
}
