// src/resolver/closure.rs

//! Transitive closure computation
//!
//! Once a node's own requirements are fully expanded, its complete
//! dependency view is derived by folding each direct edge with the target's
//! already-computed closure. The result is an insertion-ordered map so that
//! link order is stable: direct requirements come before the entries they
//! pull in, declaration order is preserved, and a dependency reached along
//! several paths appears once, at its first position, with its traits
//! aggregated. Recomputing from the same inputs yields the same map.

use super::graph::{Graph, NodeId};
use crate::require::{Require, TriState};
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Compute `transitive_deps` for a node whose edges all point at closed
/// targets
pub(crate) fn compute(graph: &mut Graph, id: NodeId) {
    let edges = graph.node(id).edges.clone();
    let mut deps: IndexMap<NodeId, Require> = IndexMap::new();

    for edge in &edges {
        let target = graph.node(edge.target);
        let target_type = target.package_type;
        let upstream: Vec<(NodeId, Require)> = target
            .transitive_deps
            .iter()
            .map(|(dep, require)| (*dep, require.clone()))
            .collect();

        let mut direct = edge.require.clone();
        direct.run = TriState::from_bool(direct.run.resolve(target_type));
        insert(&mut deps, edge.target, direct.clone());

        for (dep, up) in upstream {
            if let Some(down) = direct.transform_downstream(target_type, &up) {
                insert(&mut deps, dep, down);
            }
        }
    }

    graph.node_mut(id).transitive_deps = deps;
}

fn insert(deps: &mut IndexMap<NodeId, Require>, id: NodeId, require: Require) {
    match deps.entry(id) {
        Entry::Occupied(mut existing) => existing.get_mut().aggregate(&require),
        Entry::Vacant(slot) => {
            slot.insert(require);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Options, Settings};
    use crate::recipe::Recipe;
    use crate::reference::Reference;
    use crate::require::PackageType;
    use crate::resolver::conflict::Scopes;
    use crate::resolver::context::Context;
    use crate::resolver::graph::Edge;

    fn add(graph: &mut Graph, reference: &str, package_type: PackageType) -> NodeId {
        graph.add_node(
            Reference::parse(reference).unwrap(),
            Context::Host,
            Settings::new(),
            Options::new(),
            &Recipe::new(package_type),
            Vec::new(),
            Scopes::ROOT,
        )
    }

    fn link(graph: &mut Graph, from: NodeId, to: NodeId, require: Require) {
        graph.node_mut(from).edges.push(Edge { require, target: to });
        graph.node_mut(to).dependents.push(from);
    }

    #[test]
    fn test_direct_before_transitive() {
        let mut graph = Graph::new();
        let app = add(&mut graph, "app/1.0", PackageType::Application);
        let libb = add(&mut graph, "libb/1.0", PackageType::StaticLibrary);
        let liba = add(&mut graph, "liba/1.0", PackageType::StaticLibrary);
        link(&mut graph, libb, liba, Require::parse("liba/1.0").unwrap());
        link(&mut graph, app, libb, Require::parse("libb/1.0").unwrap());

        compute(&mut graph, libb);
        compute(&mut graph, app);

        let order: Vec<NodeId> = graph.node(app).transitive_deps.keys().copied().collect();
        assert_eq!(order, vec![libb, liba]);
    }

    #[test]
    fn test_shared_library_closes_link_interface() {
        let mut graph = Graph::new();
        let app = add(&mut graph, "app/1.0", PackageType::Application);
        let libshared = add(&mut graph, "libshared/1.0", PackageType::SharedLibrary);
        let zlib = add(&mut graph, "zlib/1.3", PackageType::SharedLibrary);
        link(&mut graph, libshared, zlib, Require::parse("zlib/1.3").unwrap());
        link(&mut graph, app, libshared, Require::parse("libshared/1.0").unwrap());

        compute(&mut graph, libshared);
        compute(&mut graph, app);

        let through = &graph.node(app).transitive_deps[&zlib];
        assert!(!through.headers);
        assert!(!through.libs);
        // runtime artifacts of a shared dependency still matter two hops up
        assert_eq!(through.run, TriState::Yes);
    }

    #[test]
    fn test_header_only_forwards_interface_not_runtime() {
        let mut graph = Graph::new();
        let app = add(&mut graph, "app/1.0", PackageType::Application);
        let header = add(&mut graph, "span-lite/0.11", PackageType::HeaderLibrary);
        let inner = add(&mut graph, "inner/1.0", PackageType::HeaderLibrary);
        link(&mut graph, header, inner, Require::parse("inner/1.0").unwrap());
        link(&mut graph, app, header, Require::parse("span-lite/0.11").unwrap());

        compute(&mut graph, header);
        compute(&mut graph, app);

        let direct = &graph.node(app).transitive_deps[&header];
        assert_eq!(direct.run, TriState::No);

        let through = &graph.node(app).transitive_deps[&inner];
        assert!(through.headers);
        assert!(through.libs);
        assert_eq!(through.run, TriState::No);
    }

    #[test]
    fn test_diamond_aggregates_once_at_first_position() {
        let mut graph = Graph::new();
        let app = add(&mut graph, "app/1.0", PackageType::Application);
        let libb = add(&mut graph, "libb/1.0", PackageType::StaticLibrary);
        let libc = add(&mut graph, "libc/1.0", PackageType::StaticLibrary);
        let liba = add(&mut graph, "liba/1.0", PackageType::StaticLibrary);
        link(&mut graph, libb, liba, Require::parse("liba/1.0").unwrap());
        link(&mut graph, libc, liba, Require::parse("liba/1.0").unwrap());
        link(&mut graph, app, libb, Require::parse("libb/1.0").unwrap());
        link(&mut graph, app, libc, Require::parse("libc/1.0").unwrap());

        compute(&mut graph, libb);
        compute(&mut graph, libc);
        compute(&mut graph, app);

        let keys: Vec<NodeId> = graph.node(app).transitive_deps.keys().copied().collect();
        assert_eq!(keys, vec![libb, liba, libc]);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut graph = Graph::new();
        let app = add(&mut graph, "app/1.0", PackageType::Application);
        let libb = add(&mut graph, "libb/1.0", PackageType::StaticLibrary);
        let liba = add(&mut graph, "liba/1.0", PackageType::HeaderLibrary);
        link(&mut graph, libb, liba, Require::parse("liba/1.0").unwrap());
        link(&mut graph, app, libb, Require::parse("libb/1.0").unwrap());

        compute(&mut graph, libb);
        compute(&mut graph, app);
        let first = graph.node(app).transitive_deps.clone();

        compute(&mut graph, app);
        let second = graph.node(app).transitive_deps.clone();

        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_tool_requirement_stays_with_declarer() {
        let mut graph = Graph::new();
        let app = add(&mut graph, "app/1.0", PackageType::Application);
        let libb = add(&mut graph, "libb/1.0", PackageType::StaticLibrary);
        let cmake = add(&mut graph, "cmake/3.28", PackageType::Application);
        link(
            &mut graph,
            libb,
            cmake,
            Require::parse("cmake/3.28").unwrap().build_tool(),
        );
        link(&mut graph, app, libb, Require::parse("libb/1.0").unwrap());

        compute(&mut graph, libb);
        compute(&mut graph, app);

        assert!(graph.node(libb).transitive_deps.contains_key(&cmake));
        assert!(!graph.node(app).transitive_deps.contains_key(&cmake));
    }
}
