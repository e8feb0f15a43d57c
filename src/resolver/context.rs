// src/resolver/context.rs

//! Resolution context: profiles, lockfile, and per-invocation caches
//!
//! One `ResolutionContext` is owned by exactly one graph build. It carries
//! the host and build profiles, the optional lockfile, memoized version
//! enumerations and alias chains, and the non-fatal warnings accumulated
//! along the way. No state is shared between concurrent graph builds other
//! than the read-only provider behind it.

use crate::error::{Error, Result};
use crate::lockfile::Lockfile;
use crate::profile::Profile;
use crate::recipe::{Recipe, RecipeProvider};
use crate::reference::{RefSpec, Reference, VersionSpec};
use crate::require::Require;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which of the two cross-compilation profiles a node resolves against
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Context {
    /// What we are building for
    Host,
    /// What runs during the build
    Build,
}

impl Context {
    /// Context a requirement resolves in, given its consumer's context
    ///
    /// Tool requirements always land in the build context; everything else
    /// (including test requirements) stays where the consumer lives.
    pub fn for_require(consumer: Context, require: &Require) -> Context {
        if require.build {
            Context::Build
        } else {
            consumer
        }
    }
}

/// Failure while concretizing a requirement target
#[derive(Debug)]
pub(crate) enum ChaseError {
    /// Provider failure or unsatisfiable range
    Provider(Error),
    /// An alias chain returned to a reference it already visited
    Loop {
        requested: String,
        ancestor: Reference,
    },
}

/// Per-invocation resolution state
pub struct ResolutionContext<'a> {
    provider: &'a dyn RecipeProvider,
    host: Profile,
    build: Profile,
    lockfile: Option<Lockfile>,
    /// Version enumerations, one provider round-trip per identity
    versions: HashMap<String, Vec<crate::version::Version>>,
    /// Fully chased alias chains: entry reference -> final target
    aliases: HashMap<Reference, RefSpec>,
    /// Non-fatal issues accumulated during resolution
    pub warnings: Vec<String>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(provider: &'a dyn RecipeProvider, host: Profile, build: Profile) -> Self {
        Self {
            provider,
            host,
            build,
            lockfile: None,
            versions: HashMap::new(),
            aliases: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_lockfile(mut self, lockfile: Lockfile) -> Self {
        self.lockfile = Some(lockfile);
        self
    }

    pub fn profile(&self, context: Context) -> &Profile {
        match context {
            Context::Host => &self.host,
            Context::Build => &self.build,
        }
    }

    /// Fetch and validate a recipe for an exact reference
    pub(crate) fn get_recipe(&self, reference: &Reference) -> Result<Recipe> {
        let recipe = self.provider.get_recipe(reference)?;
        recipe.validate(reference)?;
        Ok(recipe)
    }

    fn versions_for(
        &mut self,
        name: &str,
        user: Option<&str>,
        channel: Option<&str>,
    ) -> Result<Vec<crate::version::Version>> {
        let key = format!("{}@{}/{}", name, user.unwrap_or("_"), channel.unwrap_or("_"));
        if let Some(cached) = self.versions.get(&key) {
            return Ok(cached.clone());
        }
        let mut versions = self.provider.list_versions(name, user, channel)?;
        versions.sort();
        self.versions.insert(key, versions.clone());
        Ok(versions)
    }

    /// Turn a declaration into an exact reference (lockfile, then range)
    fn concretize(&mut self, spec: &RefSpec) -> Result<Reference> {
        match &spec.version {
            VersionSpec::Exact(v) => Ok(spec.to_reference(v.clone())),
            VersionSpec::Range(range) => {
                let candidates =
                    self.versions_for(&spec.name, spec.user.as_deref(), spec.channel.as_deref())?;
                let picked = range.resolve(candidates.iter()).cloned().ok_or_else(|| {
                    Error::RangeResolution {
                        name: spec.name.clone(),
                        range: range.to_string(),
                        candidates: candidates.iter().map(ToString::to_string).collect(),
                    }
                })?;
                for option in &range.unknown_options {
                    self.warnings.push(format!(
                        "unrecognized option '{}' in range of '{}'",
                        option, spec
                    ));
                }
                tracing::debug!(name = %spec.name, version = %picked, "resolved version range");
                Ok(spec.to_reference(picked))
            }
        }
    }

    /// Resolve a requirement target to a concrete reference and its recipe
    ///
    /// Lockfile pins pre-empt range and alias handling entirely. Otherwise
    /// ranges are resolved to the highest satisfying candidate and alias
    /// recipes are chased until a real recipe is reached, with loop
    /// detection over the chase chain.
    pub(crate) fn resolve_target(
        &mut self,
        spec: &RefSpec,
    ) -> std::result::Result<(Reference, Recipe), ChaseError> {
        if let Some(entry) = self.lockfile.as_ref().and_then(|l| {
            l.find(&spec.name, spec.user.as_deref(), spec.channel.as_deref())
        }) {
            let reference = entry.to_reference();
            tracing::debug!(reference = %reference, "using locked reference");
            let recipe = self.get_recipe(&reference).map_err(ChaseError::Provider)?;
            return Ok((reference, recipe));
        }

        let mut current = spec.clone();
        let mut seen: Vec<Reference> = Vec::new();
        loop {
            let reference = self.concretize(&current).map_err(ChaseError::Provider)?;

            if let Some(target) = self.aliases.get(&reference) {
                if seen.contains(&reference) {
                    return Err(ChaseError::Loop {
                        requested: spec.to_string(),
                        ancestor: reference,
                    });
                }
                seen.push(reference);
                current = target.clone();
                continue;
            }

            let recipe = self.get_recipe(&reference).map_err(ChaseError::Provider)?;
            match recipe.alias_target {
                Some(target) => {
                    if seen.contains(&reference) {
                        return Err(ChaseError::Loop {
                            requested: spec.to_string(),
                            ancestor: reference,
                        });
                    }
                    tracing::debug!(alias = %reference, target = %target, "following alias");
                    self.aliases.insert(reference.clone(), target.clone());
                    seen.push(reference);
                    current = target;
                }
                None => return Ok((reference, recipe)),
            }
        }
    }

    /// Record a non-fatal issue
    pub(crate) fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

impl std::fmt::Debug for ResolutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("lockfile", &self.lockfile.is_some())
            .field("cached_version_sets", &self.versions.len())
            .field("warnings", &self.warnings.len())
            .finish()
    }
}
