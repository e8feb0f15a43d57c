// src/recipe/mod.rs

//! Recipe data and the provider boundary
//!
//! A [`Recipe`] is the resolver's view of one package revision: its declared
//! requirements, option defaults, settings of interest, package type,
//! provided capabilities, and (for alias recipes) the redirect target.
//! Loading and evaluating recipe files, caches and remotes all live behind
//! the [`RecipeProvider`] trait; the resolver only ever asks "what does this
//! reference declare" and "which versions of this name exist".
//!
//! [`MemoryProvider`] is the bundled implementation: a pre-populated universe
//! used by the test suite and by callers that materialize their cache up
//! front.

use crate::error::{Error, Result};
use crate::profile::OptionAssignment;
use crate::reference::{RefSpec, Reference};
use crate::require::{PackageType, Require};
use crate::version::Version;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Declared content of one package revision
#[derive(Debug, Clone, Default)]
pub struct Recipe {
    pub package_type: PackageType,
    /// Requirements in declaration order; order drives expansion order
    pub requires: Vec<Require>,
    /// Names of options this package understands (empty = accept any)
    pub options: Vec<String>,
    /// Option defaults, for the package itself and for its dependencies
    pub default_options: Vec<OptionAssignment>,
    /// Setting names that affect this package's binary (empty = all)
    pub settings: Vec<String>,
    /// Logical capabilities this package satisfies
    pub provides: Vec<String>,
    /// Redirect target when this recipe is an alias
    pub alias_target: Option<RefSpec>,
}

impl Recipe {
    pub fn new(package_type: PackageType) -> Self {
        Self {
            package_type,
            ..Self::default()
        }
    }

    /// An alias recipe: its only content is the redirect target
    pub fn alias(target: &str) -> Result<Self> {
        Ok(Self {
            alias_target: Some(RefSpec::parse(target)?),
            ..Self::default()
        })
    }

    pub fn with_require(mut self, require: Require) -> Self {
        self.requires.push(require);
        self
    }

    pub fn with_option(mut self, name: &str) -> Self {
        self.options.push(name.to_string());
        self
    }

    pub fn with_default_option(mut self, assignment: OptionAssignment) -> Self {
        self.default_options.push(assignment);
        self
    }

    pub fn with_setting(mut self, name: &str) -> Self {
        self.settings.push(name.to_string());
        self
    }

    pub fn with_provides(mut self, capability: &str) -> Self {
        self.provides.push(capability.to_string());
        self
    }

    /// Own option defaults (unscoped assignments)
    pub fn own_defaults(&self) -> impl Iterator<Item = &OptionAssignment> {
        self.default_options.iter().filter(|a| a.is_own())
    }

    /// Option assignments targeting dependencies (scoped assignments)
    pub fn dependency_overrides(&self) -> impl Iterator<Item = &OptionAssignment> {
        self.default_options.iter().filter(|a| !a.is_own())
    }

    /// Reject recipe shapes the resolver cannot work with
    pub fn validate(&self, reference: &Reference) -> Result<()> {
        if self.alias_target.is_some()
            && (!self.requires.is_empty()
                || !self.provides.is_empty()
                || !self.default_options.is_empty())
        {
            return Err(Error::RecipeData {
                reference: reference.to_string(),
                reason: "alias recipes must not declare requirements, provides or options"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// One known recipe revision, newest first in enumeration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionEntry {
    pub revision: String,
    pub timestamp: DateTime<Utc>,
}

/// Source of recipe data and version knowledge
///
/// Implementations wrap the local cache and whatever remotes are enabled;
/// lookups may block on I/O but must answer synchronously.
pub trait RecipeProvider {
    /// Declared content of an exact reference
    fn get_recipe(&self, reference: &Reference) -> Result<Recipe>;

    /// Known versions for a package identity, ascending; empty when the
    /// name is unknown
    fn list_versions(
        &self,
        name: &str,
        user: Option<&str>,
        channel: Option<&str>,
    ) -> Result<Vec<Version>>;

    /// Known recipe revisions for an exact reference, newest first
    fn list_revisions(&self, reference: &Reference) -> Result<Vec<RevisionEntry>>;
}

/// In-memory recipe universe
#[derive(Debug, Default)]
pub struct MemoryProvider {
    recipes: HashMap<String, BTreeMap<Version, Recipe>>,
    revisions: HashMap<String, Vec<RevisionEntry>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe under a concrete reference like `"zlib/1.3"`
    pub fn add(&mut self, reference: &str, recipe: Recipe) -> Result<&mut Self> {
        let reference = Reference::parse(reference)?;
        self.recipes
            .entry(reference.identity_key())
            .or_default()
            .insert(reference.version, recipe);
        Ok(self)
    }

    /// Record a known revision for an exact reference, newest first
    pub fn add_revision(
        &mut self,
        reference: &str,
        revision: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<&mut Self> {
        let reference = Reference::parse(reference)?;
        self.revisions
            .entry(reference.to_string())
            .or_default()
            .push(RevisionEntry {
                revision: revision.to_string(),
                timestamp,
            });
        Ok(self)
    }
}

impl RecipeProvider for MemoryProvider {
    fn get_recipe(&self, reference: &Reference) -> Result<Recipe> {
        self.recipes
            .get(&reference.identity_key())
            .and_then(|versions| {
                versions
                    .iter()
                    .find(|(v, _)| v.same_version(&reference.version))
                    .map(|(_, r)| r.clone())
            })
            .ok_or_else(|| Error::RecipeNotFound(reference.to_string()))
    }

    fn list_versions(
        &self,
        name: &str,
        user: Option<&str>,
        channel: Option<&str>,
    ) -> Result<Vec<Version>> {
        let key = format!("{}@{}/{}", name, user.unwrap_or("_"), channel.unwrap_or("_"));
        Ok(self
            .recipes
            .get(&key)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn list_revisions(&self, reference: &Reference) -> Result<Vec<RevisionEntry>> {
        let mut entries = self
            .revisions
            .get(&reference.to_string())
            .cloned()
            .unwrap_or_default();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}
