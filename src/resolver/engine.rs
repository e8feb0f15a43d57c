// src/resolver/engine.rs

//! Depth-first graph expansion
//!
//! The engine seeds a worklist from the root's declared requirements and
//! drains it depth-first in declaration order: each requirement is fully
//! expanded before its next sibling. That order is significant, not just
//! deterministic: the first branch to reach a package decides its options
//! when no explicit override exists, and conflict attribution always blames
//! the second requirement to arrive.
//!
//! For each `(consumer, requirement)` pair:
//! 1. ancestor override/force declarations may replace the requested version
//!    (closest to the root wins);
//! 2. the target context is split off (tool requirements build-side);
//! 3. already-resolved identities visible from the consumer's scope are
//!    reconciled: reuse when the resolved version satisfies the request,
//!    conflict otherwise;
//! 4. unresolved targets go through lockfile pins, version ranges and alias
//!    chains, then through loop, provides and runtime checks;
//! 5. a node identity key match reuses the existing node (diamond
//!    collapse); anything else becomes a fresh node whose requirements are
//!    expanded recursively.
//!
//! The first fatal error aborts expansion; the partially built graph rides
//! along inside [`ResolveFailure`] for diagnostics.

use super::closure;
use super::conflict::{GraphError, ScopeId, Scopes};
use super::context::{ChaseError, Context, ResolutionContext};
use super::graph::{Edge, Graph, NodeId, NodeKey, NodeState};
use crate::profile::Options;
use crate::recipe::Recipe;
use crate::reference::Reference;
use crate::require::{OverrideKind, Require};
use std::fmt;

/// A failed build: the error plus everything resolved up to that point
#[derive(Debug)]
pub struct ResolveFailure {
    pub graph: Graph,
    pub error: GraphError,
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ResolveFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Builds one dependency graph from a root reference
pub struct GraphBuilder<'a> {
    ctx: ResolutionContext<'a>,
    graph: Graph,
    scopes: Scopes,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(ctx: ResolutionContext<'a>) -> Self {
        Self {
            ctx,
            graph: Graph::new(),
            scopes: Scopes::new(),
        }
    }

    /// Expand the full graph below `root`
    ///
    /// On failure the partially built graph is returned alongside the error
    /// so callers can still render what was requested versus what clashed.
    /// Partial graphs are diagnostics only, never resumption points.
    pub fn build(mut self, root: &Reference) -> Result<Graph, Box<ResolveFailure>> {
        match self.expand_root(root) {
            Ok(()) => Ok(self.graph),
            Err(error) => Err(Box::new(ResolveFailure {
                graph: self.graph,
                error,
            })),
        }
    }

    /// Accumulated non-fatal warnings (inspect before dropping the builder)
    pub fn warnings(&self) -> &[String] {
        &self.ctx.warnings
    }

    fn expand_root(&mut self, root: &Reference) -> Result<(), GraphError> {
        let recipe = self.ctx.get_recipe(root).map_err(|source| GraphError::Missing {
            requested: root.to_string(),
            consumer: root.clone(),
            source,
        })?;

        let settings = self
            .ctx
            .profile(Context::Host)
            .settings
            .project(&recipe.settings);
        let mut options = Options::new();
        for assignment in recipe.own_defaults() {
            options.set(&assignment.key, &assignment.value);
        }

        let id = self.graph.add_node(
            root.clone(),
            Context::Host,
            settings,
            options,
            &recipe,
            Vec::new(),
            Scopes::ROOT,
        );
        for require in &mut self.graph.node_mut(id).requires {
            require.direct = true;
        }
        self.scopes
            .register_resolved(Scopes::ROOT, Context::Host, &root.identity_key(), id);
        for capability in &recipe.provides {
            self.scopes
                .register_provides(Scopes::ROOT, Context::Host, capability, id);
        }

        tracing::debug!(reference = %root, "expanding root");
        self.expand_node(id)
    }

    fn expand_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.graph.node_mut(id).state = NodeState::Expanding;

        let requires = self.graph.node(id).requires.clone();
        for require in requires {
            // An override adds no edge of its own; it only steers versions
            // requested elsewhere in the graph
            if require.override_kind == OverrideKind::Override {
                continue;
            }
            if let Err(error) = self.resolve_require(id, &require) {
                self.graph.node_mut(id).state = NodeState::Errored;
                return Err(error);
            }
        }

        self.graph.node_mut(id).state = NodeState::Stable;
        closure::compute(&mut self.graph, id);
        Ok(())
    }

    fn resolve_require(&mut self, consumer: NodeId, require: &Require) -> Result<(), GraphError> {
        let consumer_ref = self.graph.node(consumer).reference.clone();
        let consumer_context = self.graph.node(consumer).context;
        let consumer_scope = self.graph.node(consumer).scope;
        let chain: Vec<NodeId> = {
            let node = self.graph.node(consumer);
            node.path.iter().copied().chain([consumer]).collect()
        };

        // Ancestor override scan: the declaration closest to the root wins
        // for every requirement of this name reachable below it
        let mut spec = require.spec.clone();
        'overrides: for ancestor in &chain {
            for declared in &self.graph.node(*ancestor).requires {
                if declared.override_kind != OverrideKind::None
                    && declared.spec.same_identity(&spec)
                    && !(*ancestor == consumer && declared == require)
                {
                    tracing::debug!(
                        name = %spec.name,
                        from = %declared.spec,
                        by = %self.graph.node(*ancestor).reference,
                        "applying version override"
                    );
                    spec = declared.spec.clone();
                    break 'overrides;
                }
            }
        }

        let target_context = Context::for_require(consumer_context, require);

        // A visible node of this identity may already exist; adopt its
        // version when the request admits it. A satisfied requirement that
        // lands back on an expansion ancestor is a true cycle. An exact
        // mismatch falls through: the requested version may still be an
        // alias whose chain ends at the resolved node.
        let mut mismatched = None;
        if let Some(existing) =
            self.scopes
                .lookup_resolved(consumer_scope, target_context, &spec.identity_key())
        {
            let existing_version = self.graph.node(existing).reference.version.clone();
            if spec.version.satisfied_by(&existing_version) {
                if chain.contains(&existing) {
                    return Err(GraphError::Loop {
                        requested: spec.to_string(),
                        consumer: consumer_ref,
                        ancestor: self.graph.node(existing).reference.clone(),
                    });
                }
                tracing::debug!(
                    requested = %spec,
                    node = %self.graph.node(existing).reference,
                    "reusing resolved node"
                );
                return self.attach(consumer, require, existing);
            }
            mismatched = Some(existing);
        }

        // Lockfile pins, version ranges, alias chains
        let (target_ref, recipe) = match self.ctx.resolve_target(&spec) {
            Ok(resolved) => resolved,
            Err(ChaseError::Loop {
                requested,
                ancestor,
            }) => {
                return Err(GraphError::Loop {
                    requested,
                    consumer: consumer_ref,
                    ancestor,
                })
            }
            Err(ChaseError::Provider(source)) => {
                // A requirement that cannot be fetched but clashes with an
                // already-resolved identity is better reported as the clash
                if let Some(existing) = mismatched {
                    return Err(self.conflict(
                        &spec.name,
                        &spec.to_string(),
                        &consumer_ref,
                        existing,
                    ));
                }
                return Err(GraphError::Missing {
                    requested: spec.to_string(),
                    consumer: consumer_ref,
                    source,
                })
            }
        };

        // Reconcile the concrete reference against the identity resolved in
        // scope (the requested name, or whatever an alias redirected to)
        if let Some(existing) = self.scopes.lookup_resolved(
            consumer_scope,
            target_context,
            &target_ref.identity_key(),
        ) {
            let existing_version = self.graph.node(existing).reference.version.clone();
            if target_ref.version.same_version(&existing_version) {
                if chain.contains(&existing) {
                    return Err(GraphError::Loop {
                        requested: spec.to_string(),
                        consumer: consumer_ref,
                        ancestor: self.graph.node(existing).reference.clone(),
                    });
                }
                return self.attach(consumer, require, existing);
            }
            return Err(self.conflict(
                &target_ref.name,
                &spec.to_string(),
                &consumer_ref,
                existing,
            ));
        }

        // A requirement that lands on an expansion ancestor is a true cycle,
        // whatever context it resolves in (tool self-requirements included)
        for ancestor in &chain {
            let ancestor_ref = &self.graph.node(*ancestor).reference;
            if ancestor_ref.matches_ignoring_revision(&target_ref) {
                return Err(GraphError::Loop {
                    requested: spec.to_string(),
                    consumer: consumer_ref,
                    ancestor: ancestor_ref.clone(),
                });
            }
        }

        let settings = self
            .ctx
            .profile(target_context)
            .settings
            .project(&recipe.settings);
        let options = self.compute_options(&recipe, &chain, &target_ref.name);

        // Same reference, context, settings and options means the same node,
        // even when reached from an unrelated or private branch
        let key = NodeKey {
            reference: target_ref.clone(),
            context: target_context,
            settings: settings.clone(),
            options: options.clone(),
        };
        if let Some(shared) = self.graph.find_by_key(&key) {
            // A private requirement keeps the shared node out of the
            // consumer's visible scope; the node itself is still shared
            if require.visible {
                self.adopt_into_scope(consumer_scope, shared)?;
            }
            tracing::debug!(node = %target_ref, "collapsing onto shared node");
            return self.attach(consumer, require, shared);
        }

        // Fresh node
        let scope = if require.visible {
            consumer_scope
        } else {
            self.scopes.child(consumer_scope)
        };
        for capability in &recipe.provides {
            if let Some(other) = self
                .scopes
                .lookup_provides(scope, target_context, capability)
            {
                return Err(GraphError::Provides {
                    capability: capability.clone(),
                    first: self.graph.node(other).reference.clone(),
                    second: target_ref,
                });
            }
        }

        let id = self.graph.add_node(
            target_ref.clone(),
            target_context,
            settings,
            options,
            &recipe,
            chain,
            scope,
        );
        self.scopes
            .register_resolved(scope, target_context, &target_ref.identity_key(), id);
        for capability in &recipe.provides {
            self.scopes
                .register_provides(scope, target_context, capability, id);
        }
        tracing::debug!(reference = %target_ref, context = %target_context, "created node");

        self.attach(consumer, require, id)?;
        self.expand_node(id)
    }

    /// Wire an edge from consumer to target and enforce runtime coexistence
    fn attach(
        &mut self,
        consumer: NodeId,
        require: &Require,
        target: NodeId,
    ) -> Result<(), GraphError> {
        let target_ref = self.graph.node(target).reference.clone();
        let target_type = self.graph.node(target).package_type;
        let target_scope = self.graph.node(target).scope;
        let target_context = self.graph.node(target).context;

        self.graph.node_mut(consumer).edges.push(Edge {
            require: require.clone(),
            target,
        });
        if !self.graph.node(target).dependents.contains(&consumer) {
            self.graph.node_mut(target).dependents.push(consumer);
        }

        // Two distinct packages that must coexist at run time cannot share a
        // runtime artifact name (two builds of the same runtime, renamed
        // forks installing the same shared object)
        if require.run.resolve(target_type) {
            match self
                .scopes
                .lookup_runtime(target_scope, target_context, &target_ref.name)
            {
                Some(other) if other != target => {
                    return Err(GraphError::Runtime {
                        name: target_ref.name.clone(),
                        first: self.graph.node(other).reference.clone(),
                        second: target_ref,
                    });
                }
                Some(_) => {}
                None => {
                    self.scopes.register_runtime(
                        target_scope,
                        target_context,
                        &target_ref.name,
                        target,
                    );
                }
            }
        }
        Ok(())
    }

    /// Make a structurally shared node visible inside another scope
    fn adopt_into_scope(&mut self, scope: ScopeId, node: NodeId) -> Result<(), GraphError> {
        let reference = self.graph.node(node).reference.clone();
        let context = self.graph.node(node).context;
        let provides = self.graph.node(node).provides.clone();

        for capability in &provides {
            match self.scopes.lookup_provides(scope, context, capability) {
                Some(other) if other != node => {
                    return Err(GraphError::Provides {
                        capability: capability.clone(),
                        first: self.graph.node(other).reference.clone(),
                        second: reference,
                    });
                }
                Some(_) => {}
                None => self
                    .scopes
                    .register_provides(scope, context, capability, node),
            }
        }
        self.scopes
            .register_resolved(scope, context, &reference.identity_key(), node);
        Ok(())
    }

    /// Options for a candidate node: its recipe's own defaults overlaid by
    /// every ancestor's scoped assignments, applied consumer-first and root
    /// last so the declaration closest to the root wins
    fn compute_options(&mut self, recipe: &Recipe, chain: &[NodeId], name: &str) -> Options {
        let declared = |key: &str| recipe.options.is_empty() || recipe.options.iter().any(|o| o == key);

        let mut options = Options::new();
        for assignment in recipe.own_defaults() {
            options.set(&assignment.key, &assignment.value);
        }
        for ancestor in chain.iter().rev() {
            let assignments: Vec<_> = self
                .graph
                .node(*ancestor)
                .option_overrides
                .iter()
                .filter(|a| a.applies_to(name))
                .cloned()
                .collect();
            for assignment in assignments {
                if !declared(&assignment.key) {
                    self.ctx.warn(format!(
                        "'{}' has no option '{}' assigned by '{}'",
                        name,
                        assignment.key,
                        self.graph.node(*ancestor).reference
                    ));
                    continue;
                }
                options.set(&assignment.key, &assignment.value);
            }
        }
        options
    }

    fn conflict(
        &self,
        name: &str,
        requested: &str,
        consumer: &Reference,
        existing: NodeId,
    ) -> GraphError {
        let existing_node = self.graph.node(existing);
        let existing_dependent = existing_node
            .dependents
            .first()
            .map(|d| self.graph.node(*d).reference.clone())
            .unwrap_or_else(|| existing_node.reference.clone());
        GraphError::Conflict {
            name: name.to_string(),
            requested: requested.to_string(),
            consumer: consumer.clone(),
            existing: existing_node.reference.clone(),
            existing_dependent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Profile, Settings};
    use crate::recipe::{MemoryProvider, Recipe};
    use crate::require::PackageType;

    fn profile() -> Profile {
        let mut settings = Settings::new();
        settings.set("os", "Linux");
        Profile::new(settings)
    }

    fn resolve(provider: &MemoryProvider, root: &str) -> Result<Graph, Box<ResolveFailure>> {
        let ctx = ResolutionContext::new(provider, profile(), profile());
        GraphBuilder::new(ctx).build(&Reference::parse(root).unwrap())
    }

    #[test]
    fn test_single_node_graph() {
        let mut provider = MemoryProvider::new();
        provider
            .add("app/1.0", Recipe::new(PackageType::Application))
            .unwrap();

        let graph = resolve(&provider, "app/1.0").unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(graph.root()).state, NodeState::Stable);
        assert!(graph.node(graph.root()).transitive_deps.is_empty());
    }

    #[test]
    fn test_chain_is_expanded_depth_first() {
        let mut provider = MemoryProvider::new();
        provider
            .add(
                "app/1.0",
                Recipe::new(PackageType::Application)
                    .with_require(Require::parse("libb/1.0").unwrap()),
            )
            .unwrap();
        provider
            .add(
                "libb/1.0",
                Recipe::new(PackageType::StaticLibrary)
                    .with_require(Require::parse("liba/1.0").unwrap()),
            )
            .unwrap();
        provider
            .add("liba/1.0", Recipe::new(PackageType::StaticLibrary))
            .unwrap();

        let graph = resolve(&provider, "app/1.0").unwrap();
        assert_eq!(graph.len(), 3);
        for node in graph.nodes() {
            assert_eq!(node.state, NodeState::Stable);
        }
    }

    #[test]
    fn test_tool_requirement_lands_in_build_context() {
        let mut provider = MemoryProvider::new();
        provider
            .add(
                "app/1.0",
                Recipe::new(PackageType::Application)
                    .with_require(Require::parse("cmake/3.28").unwrap().build_tool()),
            )
            .unwrap();
        provider
            .add("cmake/3.28", Recipe::new(PackageType::Application))
            .unwrap();

        let graph = resolve(&provider, "app/1.0").unwrap();
        let cmake = graph.nodes_named("cmake")[0];
        assert_eq!(cmake.context, Context::Build);
    }

    #[test]
    fn test_same_reference_in_both_contexts_is_two_nodes() {
        let mut provider = MemoryProvider::new();
        provider
            .add(
                "app/1.0",
                Recipe::new(PackageType::Application)
                    .with_require(Require::parse("protobuf/25.0").unwrap())
                    .with_require(Require::parse("protobuf/25.0").unwrap().build_tool()),
            )
            .unwrap();
        provider
            .add("protobuf/25.0", Recipe::new(PackageType::SharedLibrary))
            .unwrap();

        let graph = resolve(&provider, "app/1.0").unwrap();
        let nodes = graph.nodes_named("protobuf");
        assert_eq!(nodes.len(), 2);
        let contexts: Vec<Context> = nodes.iter().map(|n| n.context).collect();
        assert!(contexts.contains(&Context::Host));
        assert!(contexts.contains(&Context::Build));
    }

    #[test]
    fn test_missing_recipe_reports_requirement() {
        let mut provider = MemoryProvider::new();
        provider
            .add(
                "app/1.0",
                Recipe::new(PackageType::Application)
                    .with_require(Require::parse("ghost/1.0").unwrap()),
            )
            .unwrap();

        let failure = resolve(&provider, "app/1.0").unwrap_err();
        assert!(matches!(failure.error, GraphError::Missing { .. }));
        // the partial graph still holds the root
        assert_eq!(failure.graph.len(), 1);
        assert_eq!(
            failure.graph.node(failure.graph.root()).state,
            NodeState::Errored
        );
    }

    #[test]
    fn test_force_requirement_keeps_edge_and_steers_version() {
        let mut provider = MemoryProvider::new();
        provider
            .add(
                "app/1.0",
                Recipe::new(PackageType::Application)
                    .with_require(Require::parse("libb/1.0").unwrap())
                    .with_require(Require::parse("zlib/2.0").unwrap().as_force()),
            )
            .unwrap();
        provider
            .add(
                "libb/1.0",
                Recipe::new(PackageType::StaticLibrary)
                    .with_require(Require::parse("zlib/1.3").unwrap()),
            )
            .unwrap();
        provider
            .add("zlib/1.3", Recipe::new(PackageType::StaticLibrary))
            .unwrap();
        provider
            .add("zlib/2.0", Recipe::new(PackageType::StaticLibrary))
            .unwrap();

        let graph = resolve(&provider, "app/1.0").unwrap();
        let zlibs = graph.nodes_named("zlib");
        assert_eq!(zlibs.len(), 1);
        assert_eq!(zlibs[0].reference.version.as_str(), "2.0");
        // forced requirement contributed a root edge too
        assert!(graph
            .node(graph.root())
            .edges
            .iter()
            .any(|e| e.target == zlibs[0].id));
    }
}
