// src/reference.rs

//! Package references
//!
//! A reference identifies a package occurrence using the format:
//! `name/version[@user[/channel]][#revision]`
//!
//! Examples:
//! - `zlib/1.3` - plain package
//! - `boost/1.84.0@mycorp/stable` - user/channel qualified
//! - `openssl/3.2.1#fa41a22d` - pinned recipe revision
//!
//! Two references share a *package identity* when name, user and channel
//! match; version and revision are deliberately excluded so that a single
//! identity can be requested at different versions and reconciled during
//! resolution. Requirement declarations use [`RefSpec`], whose version part
//! may still be a range expression such as `zlib/[>=1.2 <2]`.

use crate::error::{Error, Result};
use crate::version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

fn valid_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
}

/// Split `name/rest[@user[/channel]][#revision]` into raw pieces
fn split_parts(s: &str) -> Result<(&str, &str, Option<&str>, Option<&str>, Option<&str>)> {
    let (body, revision) = match s.split_once('#') {
        Some((b, r)) => (b, Some(r)),
        None => (s, None),
    };
    let (pkg, user_channel) = match body.split_once('@') {
        Some((p, uc)) => (p, Some(uc)),
        None => (body, None),
    };
    let (name, version) = pkg
        .split_once('/')
        .ok_or_else(|| Error::Parse(format!("Missing '/' in reference '{}'", s)))?;
    let (user, channel) = match user_channel {
        Some(uc) => match uc.split_once('/') {
            Some((u, c)) => (Some(u), Some(c)),
            None => (Some(uc), None),
        },
        None => (None, None),
    };
    if !valid_name(name) {
        return Err(Error::Parse(format!("Invalid package name in '{}'", s)));
    }
    if version.is_empty() {
        return Err(Error::Parse(format!("Empty version in reference '{}'", s)));
    }
    Ok((name, version, user, channel, revision))
}

fn identity_key_of(name: &str, user: Option<&str>, channel: Option<&str>) -> String {
    format!(
        "{}@{}/{}",
        name,
        user.unwrap_or("_"),
        channel.unwrap_or("_")
    )
}

/// A concrete, resolved package reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub version: Version,
    pub user: Option<String>,
    pub channel: Option<String>,
    pub revision: Option<String>,
}

impl Reference {
    pub fn new(
        name: impl Into<String>,
        version: Version,
        user: Option<String>,
        channel: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            user,
            channel,
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Parse from `name/version[@user[/channel]][#revision]`
    pub fn parse(s: &str) -> Result<Self> {
        let (name, version, user, channel, revision) = split_parts(s)?;
        if version.starts_with('[') {
            return Err(Error::Parse(format!(
                "Reference '{}' carries an unresolved version range",
                s
            )));
        }
        Ok(Self {
            name: name.to_string(),
            version: Version::parse(version)?,
            user: user.map(str::to_string),
            channel: channel.map(str::to_string),
            revision: revision.map(str::to_string),
        })
    }

    /// Same package identity: name, user and channel match
    pub fn same_identity(&self, other: &Reference) -> bool {
        self.name == other.name && self.user == other.user && self.channel == other.channel
    }

    /// Same package occurrence, ignoring the recipe revision
    pub fn matches_ignoring_revision(&self, other: &Reference) -> bool {
        self.same_identity(other) && self.version.same_version(&other.version)
    }

    /// Key used to index resolved identities during graph construction
    pub(crate) fn identity_key(&self) -> String {
        identity_key_of(&self.name, self.user.as_deref(), self.channel.as_deref())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let Some(ref user) = self.user {
            write!(f, "@{}", user)?;
            if let Some(ref channel) = self.channel {
                write!(f, "/{}", channel)?;
            }
        }
        if let Some(ref revision) = self.revision {
            write!(f, "#{}", revision)?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Reference::parse(s)
    }
}

impl Ord for Reference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.user.cmp(&other.user))
            .then_with(|| self.channel.cmp(&other.channel))
            .then_with(|| self.revision.cmp(&other.revision))
    }
}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The version part of a requirement declaration
#[derive(Debug, Clone, PartialEq)]
pub enum VersionSpec {
    /// A single version; satisfied only by that version
    Exact(Version),
    /// A range expression; satisfied by anything in range
    Range(VersionRange),
}

impl VersionSpec {
    pub fn satisfied_by(&self, version: &Version) -> bool {
        match self {
            VersionSpec::Exact(v) => v.same_version(version),
            VersionSpec::Range(r) => r.satisfies(version),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, VersionSpec::Range(_))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Exact(v) => write!(f, "{}", v),
            VersionSpec::Range(r) => write!(f, "[{}]", r),
        }
    }
}

/// A requirement target whose version may still be a range expression
#[derive(Debug, Clone, PartialEq)]
pub struct RefSpec {
    pub name: String,
    pub version: VersionSpec,
    pub user: Option<String>,
    pub channel: Option<String>,
    pub revision: Option<String>,
}

impl RefSpec {
    /// Parse from `name/version-or-[range][@user[/channel]][#revision]`
    pub fn parse(s: &str) -> Result<Self> {
        let (name, version, user, channel, revision) = split_parts(s)?;
        let version = if let Some(inner) = version.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| Error::Parse(format!("Unterminated range in '{}'", s)))?;
            VersionSpec::Range(VersionRange::parse(inner)?)
        } else {
            VersionSpec::Exact(Version::parse(version)?)
        };
        Ok(Self {
            name: name.to_string(),
            version,
            user: user.map(str::to_string),
            channel: channel.map(str::to_string),
            revision: revision.map(str::to_string),
        })
    }

    /// Same package identity as another declaration
    pub fn same_identity(&self, other: &RefSpec) -> bool {
        self.name == other.name && self.user == other.user && self.channel == other.channel
    }

    /// Turn into a concrete reference with the given version
    pub fn to_reference(&self, version: Version) -> Reference {
        Reference {
            name: self.name.clone(),
            version,
            user: self.user.clone(),
            channel: self.channel.clone(),
            revision: self.revision.clone(),
        }
    }

    pub(crate) fn identity_key(&self) -> String {
        identity_key_of(&self.name, self.user.as_deref(), self.channel.as_deref())
    }
}

impl fmt::Display for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let Some(ref user) = self.user {
            write!(f, "@{}", user)?;
            if let Some(ref channel) = self.channel {
                write!(f, "/{}", channel)?;
            }
        }
        if let Some(ref revision) = self.revision {
            write!(f, "#{}", revision)?;
        }
        Ok(())
    }
}

impl FromStr for RefSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RefSpec::parse(s)
    }
}
