//! Connected-component labelling and splitting.
//!
//! Used by the validator (path existence between sampled pairs) and by the
//! backboner's chunked mode, which filters each component independently.
//! Direction is ignored: components are weakly connected.

use std::collections::HashMap;

use petgraph::{graph::EdgeIndex, unionfind::UnionFind, visit::EdgeRef};

use crate::graph::model::{Edge, WeightedGraph};

/// Component label per node, indexed by `NodeIndex::index()`.
///
/// Labels are union-find representatives, not dense ids.
#[must_use]
pub fn component_labels(graph: &WeightedGraph) -> Vec<usize> {
    let g = graph.petgraph();
    let mut uf = UnionFind::<usize>::new(g.node_count());
    for e in g.edge_references() {
        uf.union(e.source().index(), e.target().index());
    }
    uf.into_labeling()
}

/// Number of weakly connected components (isolated nodes count as one each).
#[must_use]
pub fn component_count(graph: &WeightedGraph) -> usize {
    petgraph::algo::connected_components(graph.petgraph())
}

/// One component extracted as its own graph.
#[derive(Debug, Clone)]
pub struct ComponentSlice {
    pub graph: WeightedGraph,
    /// `origin[i]` is the parent-graph edge that sub-graph edge `i` copies.
    pub origin: Vec<EdgeIndex>,
}

/// Split `graph` into one [`ComponentSlice`] per component that has at
/// least one edge. Isolated nodes carry no edges and are not emitted.
#[must_use]
pub fn split_components(graph: &WeightedGraph) -> Vec<ComponentSlice> {
    let g = graph.petgraph();
    let labels = component_labels(graph);

    let mut slot_of_label: HashMap<usize, usize> = HashMap::new();
    let mut slices: Vec<ComponentSlice> = Vec::new();

    for e in g.edge_references() {
        let label = labels[e.source().index()];
        let slot = *slot_of_label.entry(label).or_insert_with(|| {
            slices.push(ComponentSlice {
                graph: WeightedGraph::new(graph.is_directed()),
                origin: Vec::new(),
            });
            slices.len() - 1
        });

        let slice = &mut slices[slot];
        let a = slice.graph.upsert_node(g[e.source()].clone());
        let b = slice.graph.upsert_node(g[e.target()].clone());
        let payload: Edge = e.weight().clone();
        slice.graph.add_edge(a, b, payload);
        slice.origin.push(e.id());
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::build_graph;

    #[test]
    fn two_components_split_cleanly() {
        let g = build_graph([("a", "b", 1.0), ("b", "c", 1.0), ("x", "y", 2.0)]).expect("build");
        assert_eq!(component_count(&g), 2);

        let slices = split_components(&g);
        assert_eq!(slices.len(), 2);
        let sizes: Vec<usize> = slices.iter().map(|s| s.graph.edge_count()).collect();
        assert_eq!(sizes, vec![2, 1]);

        // Origins map back to parent edges with the same payload.
        for slice in &slices {
            for (i, parent) in slice.origin.iter().enumerate() {
                let sub = &slice.graph.petgraph()[EdgeIndex::new(i)];
                assert_eq!(sub, &g.petgraph()[*parent]);
            }
        }
    }

    #[test]
    fn labels_agree_within_component() {
        let g = build_graph([("a", "b", 1.0), ("c", "d", 1.0)]).expect("build");
        let labels = component_labels(&g);
        let idx = |id: &str| g.node_index(id).expect("node").index();
        assert_eq!(labels[idx("a")], labels[idx("b")]);
        assert_ne!(labels[idx("a")], labels[idx("c")]);
    }
}
