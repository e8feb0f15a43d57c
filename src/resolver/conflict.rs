// src/resolver/conflict.rs

//! Graph construction errors and visibility scoping
//!
//! Defines the fatal error taxonomy for dependency resolution and the scope
//! machinery that decides which already-resolved nodes a new requirement can
//! see (and therefore conflict with). Every `visible=false` edge opens a
//! child scope: identities resolved inside it never leak to sibling
//! branches, while everything resolved in enclosing scopes still constrains
//! the private subtree.

use super::context::Context;
use super::graph::NodeId;
use crate::error::Error;
use crate::reference::Reference;
use std::collections::HashMap;
use thiserror::Error;

/// Fatal graph-construction errors
///
/// The first one encountered (in expansion order) aborts the build; the
/// partially built graph stays inspectable through `ResolveFailure`.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Same-identity version mismatch unresolved by override or range
    /// satisfaction
    #[error(
        "Version conflict on '{name}': '{consumer}' requires '{requested}' \
         but '{existing_dependent}' already resolved it to '{existing}'"
    )]
    Conflict {
        name: String,
        requested: String,
        consumer: Reference,
        existing: Reference,
        existing_dependent: Reference,
    },

    /// Cyclic requirement chain, including tool self-requirements
    #[error("Dependency loop: '{consumer}' requires '{requested}' which re-enters '{ancestor}'")]
    Loop {
        requested: String,
        consumer: Reference,
        ancestor: Reference,
    },

    /// Requirement could not be resolved to any known reference/version
    #[error("Could not resolve '{requested}' required by '{consumer}': {source}")]
    Missing {
        requested: String,
        consumer: Reference,
        #[source]
        source: Error,
    },

    /// Two packages in the same visibility scope supply the same capability
    #[error(
        "Duplicate provides '{capability}': both '{first}' and '{second}' \
         supply it in the same scope"
    )]
    Provides {
        capability: String,
        first: Reference,
        second: Reference,
    },

    /// Two runtime-coexisting packages collide on a runtime artifact name
    #[error(
        "Runtime conflict on '{name}': '{first}' and '{second}' cannot \
         coexist in the same process image"
    )]
    Runtime {
        name: String,
        first: Reference,
        second: Reference,
    },
}

/// Index of a visibility scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    /// Resolved package identities: (context, identity key) -> node
    resolved: HashMap<(Context, String), NodeId>,
    /// Claimed capabilities: (context, capability) -> node
    provides: HashMap<(Context, String), NodeId>,
    /// Runtime artifact names: (context, package name) -> node
    runtime: HashMap<(Context, String), NodeId>,
}

/// Tree of visibility scopes built alongside the graph
#[derive(Debug)]
pub(crate) struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Open a child scope below `parent` (for a `visible=false` edge)
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        id
    }

    fn lookup<F>(&self, from: ScopeId, f: F) -> Option<NodeId>
    where
        F: Fn(&Scope) -> Option<NodeId>,
    {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(node) = f(scope) {
                return Some(node);
            }
            current = scope.parent;
        }
        None
    }

    /// Find a resolved identity visible from `from` (walks outward)
    pub fn lookup_resolved(&self, from: ScopeId, context: Context, key: &str) -> Option<NodeId> {
        self.lookup(from, |s| s.resolved.get(&(context, key.to_string())).copied())
    }

    /// Record a resolved identity in `scope`; first registration wins
    pub fn register_resolved(
        &mut self,
        scope: ScopeId,
        context: Context,
        key: &str,
        node: NodeId,
    ) {
        self.scopes[scope.0]
            .resolved
            .entry((context, key.to_string()))
            .or_insert(node);
    }

    pub fn lookup_provides(
        &self,
        from: ScopeId,
        context: Context,
        capability: &str,
    ) -> Option<NodeId> {
        self.lookup(from, |s| {
            s.provides.get(&(context, capability.to_string())).copied()
        })
    }

    pub fn register_provides(
        &mut self,
        scope: ScopeId,
        context: Context,
        capability: &str,
        node: NodeId,
    ) {
        self.scopes[scope.0]
            .provides
            .entry((context, capability.to_string()))
            .or_insert(node);
    }

    pub fn lookup_runtime(&self, from: ScopeId, context: Context, name: &str) -> Option<NodeId> {
        self.lookup(from, |s| s.runtime.get(&(context, name.to_string())).copied())
    }

    pub fn register_runtime(&mut self, scope: ScopeId, context: Context, name: &str, node: NodeId) {
        self.scopes[scope.0]
            .runtime
            .entry((context, name.to_string()))
            .or_insert(node);
    }
}
