// src/resolver/mod.rs

//! Dependency graph construction and conflict resolution
//!
//! This module turns a root reference plus a recipe universe into a graph
//! of resolved package nodes. Expansion is depth-first in declaration
//! order, reconciling version ranges, aliases, overrides and lockfile pins
//! as it goes; conflicts, cycles, duplicate provides and runtime collisions
//! abort the build eagerly with the partially built graph preserved for
//! diagnostics. Once a node's requirements settle, its full transitive
//! dependency view is computed with propagation-accurate traits, ready for
//! binary identity computation and build scheduling downstream.
//!
//! Entry point: [`GraphBuilder::build`] with a [`ResolutionContext`].

mod closure;
mod conflict;
mod context;
mod engine;
mod graph;

pub use conflict::GraphError;
pub use context::{Context, ResolutionContext};
pub use engine::{GraphBuilder, ResolveFailure};
pub use graph::{Edge, Graph, Node, NodeId, NodeKey, NodeState};
