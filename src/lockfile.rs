// src/lockfile.rs

//! Pre-resolved version pins
//!
//! A lockfile is an optional list of `(name, user, channel) -> version`
//! pins consumed during resolution: when an entry matches a requirement's
//! identity, range and alias handling are skipped and the locked reference
//! is used directly. Locked references still go through conflict and
//! override checking like any other resolution result.
//!
//! Only the pin list is modeled here; full lockfile files and their formats
//! belong to the surrounding tooling. JSON ingestion is provided because
//! pins commonly arrive from a previous resolution dumped as JSON.

use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::version::Version;
use serde::{Deserialize, Serialize};

/// One pinned package identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl LockEntry {
    pub fn to_reference(&self) -> Reference {
        Reference {
            name: self.name.clone(),
            version: self.version.clone(),
            user: self.user.clone(),
            channel: self.channel.clone(),
            revision: self.revision.clone(),
        }
    }
}

/// An ordered set of pins; first match per identity wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    pub entries: Vec<LockEntry>,
}

impl Lockfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a concrete reference like `"zlib/1.3#abc"`
    pub fn pin(&mut self, reference: &str) -> Result<&mut Self> {
        let r = Reference::parse(reference)?;
        self.entries.push(LockEntry {
            name: r.name,
            user: r.user,
            channel: r.channel,
            version: r.version,
            revision: r.revision,
        });
        Ok(self)
    }

    pub fn find(
        &self,
        name: &str,
        user: Option<&str>,
        channel: Option<&str>,
    ) -> Option<&LockEntry> {
        self.entries.iter().find(|e| {
            e.name == name && e.user.as_deref() == user && e.channel.as_deref() == channel
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Parse(format!("Invalid lockfile: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_and_find() {
        let mut lock = Lockfile::new();
        lock.pin("zlib/1.3#abc").unwrap();
        lock.pin("boost/1.84.0@mycorp/stable").unwrap();

        let entry = lock.find("zlib", None, None).unwrap();
        assert_eq!(entry.version.as_str(), "1.3");
        assert_eq!(entry.revision.as_deref(), Some("abc"));
        assert_eq!(entry.to_reference().to_string(), "zlib/1.3#abc");

        assert!(lock.find("zlib", Some("mycorp"), None).is_none());
        assert!(lock.find("boost", Some("mycorp"), Some("stable")).is_some());
    }

    #[test]
    fn test_from_json() {
        let lock = Lockfile::from_json_str(
            r#"{"entries": [{"name": "zlib", "version": "1.3", "revision": "abc"}]}"#,
        )
        .unwrap();
        assert_eq!(lock.entries.len(), 1);
        assert_eq!(lock.find("zlib", None, None).unwrap().version.as_str(), "1.3");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Lockfile::from_json_str("not json").is_err());
    }
}
