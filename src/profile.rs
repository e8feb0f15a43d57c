// src/profile.rs

//! Profiles, settings and options
//!
//! Settings describe the platform a context builds for (`os=Linux`,
//! `arch=x86_64`, `build_type=Release`); options are per-package build
//! variations (`shared=True`, `fPIC=False`). Both participate in node
//! identity, so they are stored sorted for stable hashing and display.
//!
//! A recipe's `default_options` may also steer options of its dependencies
//! using a scoped assignment: `zlib/*:shared=False`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Platform settings for one context (sorted key/value pairs)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Settings(BTreeMap<String, String>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Restrict to the setting names a recipe declares it cares about
    ///
    /// An empty declaration keeps the full profile, so packages that do not
    /// declare settings still key their nodes on the whole platform.
    pub fn project(&self, names: &[String]) -> Settings {
        if names.is_empty() {
            return self.clone();
        }
        Settings(
            self.0
                .iter()
                .filter(|(k, _)| names.iter().any(|n| n == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

/// Option values chosen for one package occurrence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Options(BTreeMap<String, String>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

/// One option assignment from a recipe's `default_options`
///
/// `shared=True` sets the recipe's own option; `zlib/*:shared=False` steers
/// the option of a dependency matching the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionAssignment {
    /// Target package pattern; None assigns the declaring recipe's own option
    pub scope: Option<String>,
    pub key: String,
    pub value: String,
}

impl OptionAssignment {
    pub fn parse(s: &str) -> Result<Self> {
        let (lhs, value) = s
            .split_once('=')
            .ok_or_else(|| Error::Parse(format!("Missing '=' in option assignment '{}'", s)))?;
        let (scope, key) = match lhs.rsplit_once(':') {
            Some((pattern, k)) => (Some(pattern.trim().to_string()), k.trim()),
            None => (None, lhs.trim()),
        };
        if key.is_empty() {
            return Err(Error::Parse(format!("Empty option name in '{}'", s)));
        }
        Ok(Self {
            scope,
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }

    /// Whether this assignment targets the declaring recipe itself
    pub fn is_own(&self) -> bool {
        self.scope.is_none()
    }

    /// Whether a scoped assignment applies to a dependency of this name
    pub fn applies_to(&self, name: &str) -> bool {
        match &self.scope {
            None => false,
            Some(pattern) => {
                let base = pattern.strip_suffix("/*").unwrap_or(pattern);
                base == "*" || base == name
            }
        }
    }
}

impl fmt::Display for OptionAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}={}", scope, self.key, self.value),
            None => write!(f, "{}={}", self.key, self.value),
        }
    }
}

/// Inputs for resolving one context (host or build)
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub settings: Settings,
}

impl Profile {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_project() {
        let mut s = Settings::new();
        s.set("os", "Linux").set("arch", "x86_64").set("build_type", "Release");

        let projected = s.project(&["os".to_string(), "arch".to_string()]);
        assert_eq!(projected.get("os"), Some("Linux"));
        assert_eq!(projected.get("build_type"), None);

        // empty declaration keeps everything
        let full = s.project(&[]);
        assert_eq!(full, s);
    }

    #[test]
    fn test_settings_display_sorted() {
        let mut s = Settings::new();
        s.set("os", "Linux").set("arch", "x86_64");
        assert_eq!(s.to_string(), "arch=x86_64, os=Linux");
    }

    #[test]
    fn test_option_assignment_own() {
        let a = OptionAssignment::parse("shared=True").unwrap();
        assert!(a.is_own());
        assert!(!a.applies_to("zlib"));
        assert_eq!(a.key, "shared");
        assert_eq!(a.value, "True");
    }

    #[test]
    fn test_option_assignment_scoped() {
        let a = OptionAssignment::parse("zlib/*:shared=False").unwrap();
        assert!(!a.is_own());
        assert!(a.applies_to("zlib"));
        assert!(!a.applies_to("openssl"));
        assert_eq!(a.to_string(), "zlib/*:shared=False");
    }

    #[test]
    fn test_option_assignment_wildcard() {
        let a = OptionAssignment::parse("*:fPIC=True").unwrap();
        assert!(a.applies_to("zlib"));
        assert!(a.applies_to("openssl"));
    }

    #[test]
    fn test_option_assignment_exact_name() {
        let a = OptionAssignment::parse("zlib:shared=False").unwrap();
        assert!(a.applies_to("zlib"));
        assert!(!a.applies_to("zlib-ng"));
    }

    #[test]
    fn test_option_assignment_rejects_missing_eq() {
        assert!(OptionAssignment::parse("shared").is_err());
    }
}
