// src/resolver/graph.rs

//! Dependency graph data structures
//!
//! Nodes live in an arena and edges are stored as indices, so one node can
//! sit in many dependents' edge lists without ownership cycles. Node
//! identity is the full key `(reference, context, settings, options)`: two
//! requirements resolving to the same key always share one node, which is
//! what collapses diamonds instead of duplicating them.

use super::conflict::ScopeId;
use super::context::Context;
use crate::profile::{OptionAssignment, Options, Settings};
use crate::recipe::Recipe;
use crate::reference::Reference;
use crate::require::{PackageIdMode, PackageType, Require};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Index of a node in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Expansion state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Created, own requirements not yet processed
    Pending,
    /// Own requirements currently being processed
    Expanding,
    /// Fully expanded, transitive closure computed
    Stable,
    /// Expansion aborted underneath this node
    Errored,
}

/// Full identity of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub reference: Reference,
    pub context: Context,
    pub settings: Settings,
    pub options: Options,
}

/// A resolved dependency edge
#[derive(Debug, Clone)]
pub struct Edge {
    pub require: Require,
    pub target: NodeId,
}

/// A resolved package occurrence
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub reference: Reference,
    pub context: Context,
    pub settings: Settings,
    pub options: Options,
    pub package_type: PackageType,
    pub provides: Vec<String>,
    /// Declared requirements in declaration order
    pub requires: Vec<Require>,
    /// Resolved outgoing edges
    pub edges: Vec<Edge>,
    /// Back-edges to every consumer sharing this node
    pub dependents: Vec<NodeId>,
    /// Every reachable dependency with its effective propagated traits,
    /// in link order: direct requirements first, then their closures
    pub transitive_deps: IndexMap<NodeId, Require>,
    pub state: NodeState,
    /// Scoped option assignments this node's recipe declared for its
    /// dependencies, replayed while descendants compute their options
    pub(crate) option_overrides: Vec<OptionAssignment>,
    /// Expansion ancestors, root first
    pub(crate) path: Vec<NodeId>,
    pub(crate) scope: ScopeId,
}

impl Node {
    /// Direct dependency targets in declaration order
    pub fn dependencies(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.iter().map(|e| e.target)
    }
}

/// The resolved dependency graph
///
/// Built incrementally by the expansion engine; the first node added is the
/// root. After a successful build every node is `Stable` and carries its
/// full transitive closure.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<NodeKey, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root consumer (first node added)
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes resolved from a given package name, in creation order
    pub fn nodes_named(&self, name: &str) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.reference.name == name).collect()
    }

    /// Find a node by its full identity key
    pub fn find_by_key(&self, key: &NodeKey) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub(crate) fn add_node(
        &mut self,
        reference: Reference,
        context: Context,
        settings: Settings,
        options: Options,
        recipe: &Recipe,
        path: Vec<NodeId>,
        scope: ScopeId,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let key = NodeKey {
            reference: reference.clone(),
            context,
            settings: settings.clone(),
            options: options.clone(),
        };
        self.nodes.push(Node {
            id,
            reference,
            context,
            settings,
            options,
            package_type: recipe.package_type,
            provides: recipe.provides.clone(),
            requires: recipe.requires.clone(),
            edges: Vec::new(),
            dependents: Vec::new(),
            transitive_deps: IndexMap::new(),
            state: NodeState::Pending,
            option_overrides: recipe.dependency_overrides().cloned().collect(),
            path,
            scope,
        });
        self.index.insert(key, id);
        id
    }

    /// Nodes in dependencies-before-dependents order
    ///
    /// Deterministic: depth-first over declaration-ordered edges from the
    /// root, emitting each node after its dependencies. Valid because loops
    /// are construction errors, so a finished graph is acyclic.
    pub fn resolved_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::new();
        if !self.nodes.is_empty() {
            self.postorder(self.root(), &mut visited, &mut order);
        }
        order
    }

    fn postorder(&self, id: NodeId, visited: &mut HashSet<NodeId>, order: &mut Vec<NodeId>) {
        if !visited.insert(id) {
            return;
        }
        for edge in &self.node(id).edges {
            self.postorder(edge.target, visited, order);
        }
        order.push(id);
    }

    /// The dependency view handed to binary identity computation: every
    /// transitive dependency whose identity-folding mode is not `Unrelated`
    pub fn binary_requires(&self, id: NodeId) -> Vec<(NodeId, PackageIdMode)> {
        self.node(id)
            .transitive_deps
            .iter()
            .filter_map(|(dep, require)| {
                let mode = require.package_id_mode.unwrap_or_else(|| {
                    PackageIdMode::default_for(self.node(*dep).package_type, require)
                });
                (mode != PackageIdMode::Unrelated).then_some((*dep, mode))
            })
            .collect()
    }
}
