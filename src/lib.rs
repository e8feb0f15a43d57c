// src/lib.rs

//! Quarry
//!
//! Dependency graph resolution for C/C++ package management: given a root
//! package and a universe of recipes, decide exact versions, wire nodes
//! into a shared graph, and compute each node's transitive dependencies
//! with propagation-accurate traits.
//!
//! # Architecture
//!
//! - References: `name/version[@user/channel]` identities, ranges resolved
//!   to the highest satisfying candidate
//! - Requirements: trait-carrying edges (headers, libs, build, run, test,
//!   visibility) with explicit tri-state inference
//! - Two contexts: host (what we build for) and build (what runs while
//!   building), resolved against separate profiles
//! - One node per `(reference, context, settings, options)`: diamonds
//!   collapse, conflicts surface eagerly with the partial graph attached

pub mod lockfile;
pub mod profile;
pub mod recipe;
pub mod reference;
pub mod require;
pub mod resolver;
pub mod version;

mod error;

pub use error::{Error, Result};
pub use lockfile::{LockEntry, Lockfile};
pub use profile::{OptionAssignment, Options, Profile, Settings};
pub use recipe::{MemoryProvider, Recipe, RecipeProvider, RevisionEntry};
pub use reference::{RefSpec, Reference, VersionSpec};
pub use require::{OverrideKind, PackageIdMode, PackageType, Require, TriState};
pub use resolver::{
    Context, Edge, Graph, GraphBuilder, GraphError, Node, NodeId, NodeState, ResolutionContext,
    ResolveFailure,
};
pub use version::{Version, VersionRange};
