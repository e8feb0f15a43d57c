// src/version/mod.rs

//! Version handling and range satisfaction for package requirements
//!
//! C/C++ package versions are frequently not semver-compliant ("1.2",
//! "1.2.3.4", "2021.03"), so versions keep their original spelling and are
//! normalized to a semver triple for ordering. Ranges use a bracketed
//! expression: `[>=1.0 <2]`, `[~1.2]`, `[^2.1, include_prerelease]`.

use crate::error::{Error, Result};
use semver::Prerelease;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A package version: original text plus a normalized form for comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    raw: String,
    norm: semver::Version,
}

impl Version {
    /// Parse a version string
    ///
    /// Accepts semver ("1.2.3-rc1") and loose forms ("1.2", "1.2.3.4",
    /// "2021.03"). Loose forms are normalized by padding or truncating to
    /// major.minor.patch; a `-suffix` is treated as a pre-release tag.
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Error::Parse("Empty version string".to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            norm: Self::normalize(raw),
        })
    }

    /// Build a synthetic version from numeric parts (used for range bounds)
    pub(crate) fn from_parts(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            raw: format!("{}.{}.{}", major, minor, patch),
            norm: semver::Version::new(major, minor, patch),
        }
    }

    fn normalize(raw: &str) -> semver::Version {
        if let Ok(v) = semver::Version::parse(raw) {
            return v;
        }

        let (core, pre) = match raw.split_once('-') {
            Some((c, p)) => (c, Some(p)),
            None => (raw, None),
        };

        // Leading digits of each dotted component; missing components are 0
        let num = |part: Option<&str>| -> u64 {
            part.map(|p| {
                p.chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse::<u64>()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
        };

        let mut parts = core.split('.');
        let mut v = semver::Version::new(
            num(parts.next()),
            num(parts.next()),
            num(parts.next()),
        );

        if let Some(pre) = pre {
            let tag: String = pre
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
                .collect();
            if !tag.is_empty() {
                if let Ok(p) = Prerelease::new(&tag) {
                    v.pre = p;
                }
            }
        }

        v
    }

    /// The original version text
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Normalized form used for ordering
    pub fn normalized(&self) -> &semver::Version {
        &self.norm
    }

    /// Whether this version carries a pre-release tag
    pub fn is_prerelease(&self) -> bool {
        !self.norm.pre.is_empty()
    }

    /// Whether the raw text carries any pre-release marker, including the
    /// bare trailing dash form ("1.0-") used on range bounds
    pub(crate) fn has_prerelease_marker(&self) -> bool {
        self.is_prerelease() || self.raw.contains('-')
    }

    /// Number of dotted components in the raw text (before any tag)
    fn precision(&self) -> usize {
        let core = self
            .raw
            .split(['-', '+'])
            .next()
            .unwrap_or(&self.raw);
        core.split('.').count()
    }

    /// Ordering-only equality (ignores spelling differences like "1.0" vs "1.0.0")
    pub fn same_version(&self, other: &Version) -> bool {
        self.norm == other.norm
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Normalized ordering first; raw text breaks ties so that distinct
        // spellings stay distinguishable in ordered sets
        self.norm
            .cmp(&other.norm)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A single comparison inside a range expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparator {
    Ge(Version),
    Gt(Version),
    Le(Version),
    Lt(Version),
    Eq(Version),
    Ne(Version),
}

impl Comparator {
    fn holds(&self, v: &Version) -> bool {
        match self {
            Comparator::Ge(b) => v.norm >= b.norm,
            Comparator::Gt(b) => v.norm > b.norm,
            Comparator::Le(b) => v.norm <= b.norm,
            Comparator::Lt(b) => v.norm < b.norm,
            Comparator::Eq(b) => v.norm == b.norm,
            Comparator::Ne(b) => v.norm != b.norm,
        }
    }

    /// Lower bounds carrying a pre-release marker widen matching
    fn admits_prerelease(&self) -> bool {
        match self {
            Comparator::Ge(b) | Comparator::Gt(b) | Comparator::Eq(b) => {
                b.has_prerelease_marker()
            }
            _ => false,
        }
    }
}

/// A version range: conjunction of comparators plus matching options
///
/// Grammar: whitespace-separated comparators (`>= > <= < = != ~ ^`),
/// optionally followed by comma-separated options. `~x.y` expands to
/// `>=x.y <x.(y+1)`; `^` follows caret-compatibility rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    comparators: Vec<Comparator>,
    include_prerelease: bool,
    /// Options that were not recognized during parsing (non-fatal)
    pub unknown_options: Vec<String>,
}

impl VersionRange {
    /// Parse a range expression (without the surrounding brackets)
    pub fn parse(text: &str) -> Result<Self> {
        let raw = text.trim().to_string();
        let mut segments = raw.split(',');
        let expr = segments.next().unwrap_or("").trim().to_string();

        let mut include_prerelease = false;
        let mut unknown_options = Vec::new();
        for opt in segments {
            let opt = opt.trim();
            if opt.is_empty() {
                continue;
            }
            let (key, value) = match opt.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (opt, "True"),
            };
            if key == "include_prerelease" {
                include_prerelease = matches!(value, "True" | "true" | "1");
            } else {
                tracing::warn!(option = key, "ignoring unrecognized version range option");
                unknown_options.push(key.to_string());
            }
        }

        let mut comparators = Vec::new();
        for token in expr.split_whitespace() {
            if token == "*" {
                continue;
            }
            Self::parse_comparator(token, &mut comparators)?;
        }

        Ok(Self {
            raw,
            comparators,
            include_prerelease,
            unknown_options,
        })
    }

    fn parse_comparator(token: &str, out: &mut Vec<Comparator>) -> Result<()> {
        if let Some(rest) = token.strip_prefix(">=") {
            out.push(Comparator::Ge(Version::parse(rest)?));
        } else if let Some(rest) = token.strip_prefix("<=") {
            out.push(Comparator::Le(Version::parse(rest)?));
        } else if let Some(rest) = token.strip_prefix("!=") {
            out.push(Comparator::Ne(Version::parse(rest)?));
        } else if let Some(rest) = token.strip_prefix('>') {
            out.push(Comparator::Gt(Version::parse(rest)?));
        } else if let Some(rest) = token.strip_prefix('<') {
            out.push(Comparator::Lt(Version::parse(rest)?));
        } else if let Some(rest) = token.strip_prefix('=') {
            out.push(Comparator::Eq(Version::parse(rest)?));
        } else if let Some(rest) = token.strip_prefix('~') {
            let base = Version::parse(rest)?;
            let upper = if base.precision() <= 1 {
                Version::from_parts(base.norm.major + 1, 0, 0)
            } else {
                Version::from_parts(base.norm.major, base.norm.minor + 1, 0)
            };
            out.push(Comparator::Ge(base));
            out.push(Comparator::Lt(upper));
        } else if let Some(rest) = token.strip_prefix('^') {
            let base = Version::parse(rest)?;
            let upper = if base.norm.major > 0 {
                Version::from_parts(base.norm.major + 1, 0, 0)
            } else if base.norm.minor > 0 {
                Version::from_parts(0, base.norm.minor + 1, 0)
            } else {
                Version::from_parts(0, 0, base.norm.patch + 1)
            };
            out.push(Comparator::Ge(base));
            out.push(Comparator::Lt(upper));
        } else {
            out.push(Comparator::Eq(Version::parse(token)?));
        }
        Ok(())
    }

    /// Whether pre-release candidates participate in matching
    pub fn allows_prerelease(&self) -> bool {
        self.include_prerelease || self.comparators.iter().any(Comparator::admits_prerelease)
    }

    /// Check whether a version satisfies this range
    pub fn satisfies(&self, version: &Version) -> bool {
        if version.is_prerelease() && !self.allows_prerelease() {
            return false;
        }
        self.comparators.iter().all(|c| c.holds(version))
    }

    /// Select the highest candidate satisfying this range
    pub fn resolve<'v, I>(&self, candidates: I) -> Option<&'v Version>
    where
        I: IntoIterator<Item = &'v Version>,
    {
        candidates
            .into_iter()
            .filter(|v| self.satisfies(v))
            .max()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        VersionRange::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_semver() {
        let ver = v("1.2.3");
        assert_eq!(ver.normalized().major, 1);
        assert_eq!(ver.normalized().minor, 2);
        assert_eq!(ver.normalized().patch, 3);
        assert!(!ver.is_prerelease());
    }

    #[test]
    fn test_parse_loose_two_component() {
        let ver = v("1.2");
        assert_eq!(ver.normalized().major, 1);
        assert_eq!(ver.normalized().minor, 2);
        assert_eq!(ver.normalized().patch, 0);
        assert_eq!(ver.as_str(), "1.2");
    }

    #[test]
    fn test_parse_four_component() {
        let ver = v("1.2.3.4");
        assert_eq!(ver.normalized().patch, 3);
    }

    #[test]
    fn test_parse_prerelease() {
        let ver = v("2.0.0-rc1");
        assert!(ver.is_prerelease());
        let loose = v("2.0-beta");
        assert!(loose.is_prerelease());
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.2.3") < v("1.2.4"));
        assert!(v("1.2") < v("1.10"));
        assert!(v("2.0.0-rc1") < v("2.0.0"));
        assert!(v("0.9") < v("1.0"));
    }

    #[test]
    fn test_same_version_ignores_spelling() {
        assert!(v("1.0").same_version(&v("1.0.0")));
        assert_ne!(v("1.0"), v("1.0.0"));
    }

    #[test]
    fn test_range_basic() {
        let r = VersionRange::parse(">=1.0 <2").unwrap();
        assert!(r.satisfies(&v("1.0")));
        assert!(r.satisfies(&v("1.9.9")));
        assert!(!r.satisfies(&v("2.0")));
        assert!(!r.satisfies(&v("0.9")));
    }

    #[test]
    fn test_range_tilde() {
        let r = VersionRange::parse("~1.2").unwrap();
        assert!(r.satisfies(&v("1.2.0")));
        assert!(r.satisfies(&v("1.2.9")));
        assert!(!r.satisfies(&v("1.3.0")));

        let r = VersionRange::parse("~1").unwrap();
        assert!(r.satisfies(&v("1.9")));
        assert!(!r.satisfies(&v("2.0")));
    }

    #[test]
    fn test_range_caret() {
        let r = VersionRange::parse("^1.2.3").unwrap();
        assert!(r.satisfies(&v("1.9.0")));
        assert!(!r.satisfies(&v("2.0.0")));

        let r = VersionRange::parse("^0.2.3").unwrap();
        assert!(r.satisfies(&v("0.2.9")));
        assert!(!r.satisfies(&v("0.3.0")));
    }

    #[test]
    fn test_range_excludes_prerelease_by_default() {
        let r = VersionRange::parse(">=1.0").unwrap();
        assert!(!r.satisfies(&v("2.0.0-rc1")));
    }

    #[test]
    fn test_range_include_prerelease_option() {
        let r = VersionRange::parse(">=1.0, include_prerelease").unwrap();
        assert!(r.satisfies(&v("2.0.0-rc1")));
    }

    #[test]
    fn test_range_prerelease_lower_bound() {
        // A lower bound tagged with a pre-release marker widens matching
        let r = VersionRange::parse(">1.0-").unwrap();
        assert!(r.satisfies(&v("1.1.0-beta")));
    }

    #[test]
    fn test_range_unknown_option_is_nonfatal() {
        let r = VersionRange::parse(">=1.0, loose=True").unwrap();
        assert_eq!(r.unknown_options, vec!["loose".to_string()]);
        assert!(r.satisfies(&v("1.5")));
    }

    #[test]
    fn test_resolve_picks_highest() {
        let candidates = vec![v("0.1"), v("0.2")];
        let r = VersionRange::parse(">=0.0").unwrap();
        assert_eq!(r.resolve(candidates.iter()), Some(&v("0.2")));
    }

    #[test]
    fn test_resolve_monotonic() {
        // Adding a higher satisfying candidate never lowers the pick
        let r = VersionRange::parse(">=1.0").unwrap();
        let mut candidates = vec![v("1.0"), v("1.5")];
        let before = r.resolve(candidates.iter()).cloned().unwrap();
        candidates.push(v("2.0"));
        let after = r.resolve(candidates.iter()).cloned().unwrap();
        assert!(after >= before);
        assert_eq!(after, v("2.0"));
    }

    #[test]
    fn test_resolve_none_satisfies() {
        let candidates = vec![v("0.1"), v("0.2")];
        let r = VersionRange::parse(">=1.0").unwrap();
        assert_eq!(r.resolve(candidates.iter()), None);
    }

    #[test]
    fn test_range_exact_and_ne() {
        let r = VersionRange::parse("=1.5").unwrap();
        assert!(r.satisfies(&v("1.5")));
        assert!(r.satisfies(&v("1.5.0")));
        assert!(!r.satisfies(&v("1.5.1")));

        let r = VersionRange::parse(">=1.0 !=1.3").unwrap();
        assert!(r.satisfies(&v("1.2")));
        assert!(!r.satisfies(&v("1.3")));
    }
}
