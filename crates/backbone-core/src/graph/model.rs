//! The in-memory weighted graph shared by every pipeline stage.
//!
//! # Storage
//!
//! [`WeightedGraph`] wraps a petgraph [`DiGraph`] and a `node id → NodeIndex`
//! map. Undirected graphs are stored with one arc per edge (in builder
//! insertion order) and a `directed = false` flag; incidence queries then
//! walk both arc directions.
//!
//! # Weights
//!
//! Every [`Edge`] has a primary `weight` and optionally a staged *working*
//! weight produced by [`crate::weight::combine`]. Filters and statistics read
//! [`Edge::effective_weight`], which is the working weight when one is staged
//! and the primary weight otherwise. The primary weight and the attribute
//! map are never overwritten by staging.
//!
//! # Value semantics
//!
//! Transformations never mutate a graph in place; [`WeightedGraph::retain`]
//! and [`WeightedGraph::map_edges`] return fresh graphs. That keeps the
//! original available for the validator and lets independent jobs run on
//! separate threads without coordination.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, HashMap};

use petgraph::{
    Direction,
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open attribute map carried by nodes and edges.
pub type Attributes = BTreeMap<String, Value>;

/// Attribute name that refers to an edge's primary weight in
/// [`Edge::numeric_attribute`] lookups.
pub const PRIMARY_WEIGHT_KEY: &str = "weight";

// ---------------------------------------------------------------------------
// Node / Edge
// ---------------------------------------------------------------------------

/// A graph node.
///
/// Serialized field names (`id`, `type`, `partition`, `attributes`) are
/// stable: exporters rely on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: String,
    /// Free-form type tag, e.g. `"source"`, `"term"`, `"concept"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Bipartite side (0 or 1), when the graph is bipartite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Node {
    /// A bare node with no tags.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: None,
            partition: None,
            attributes: Attributes::new(),
        }
    }

    /// Set the type tag.
    #[must_use]
    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    /// Set the bipartite partition tag.
    #[must_use]
    pub fn with_partition(mut self, partition: u8) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Fill tags that are still unset from `other`; keep existing values.
    pub(crate) fn absorb(&mut self, other: Self) {
        if self.node_type.is_none() {
            self.node_type = other.node_type;
        }
        if self.partition.is_none() {
            self.partition = other.partition;
        }
        for (key, value) in other.attributes {
            self.attributes.entry(key).or_insert(value);
        }
    }
}

/// Edge payload: primary weight, staged working weight, attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Primary weight as supplied (or rewritten by normalization).
    pub weight: f64,
    /// Secondary numeric values and free-form metadata.
    pub attributes: Attributes,
    working: Option<f64>,
}

impl Edge {
    #[must_use]
    pub const fn new(weight: f64) -> Self {
        Self {
            weight,
            attributes: Attributes::new(),
            working: None,
        }
    }

    #[must_use]
    pub const fn with_attributes(weight: f64, attributes: Attributes) -> Self {
        Self {
            weight,
            attributes,
            working: None,
        }
    }

    /// The weight every filter and statistic reads.
    #[must_use]
    pub fn effective_weight(&self) -> f64 {
        self.working.unwrap_or(self.weight)
    }

    /// The staged working weight, if [`crate::weight::combine`] produced one.
    #[must_use]
    pub const fn working_weight(&self) -> Option<f64> {
        self.working
    }

    /// Look up a numeric value: `"weight"` is the primary weight, anything
    /// else is read from the attribute map. Non-numeric values yield `None`.
    #[must_use]
    pub fn numeric_attribute(&self, key: &str) -> Option<f64> {
        if key == PRIMARY_WEIGHT_KEY {
            return Some(self.weight);
        }
        self.attributes.get(key).and_then(Value::as_f64)
    }

    /// Overwrite whichever slot is currently effective.
    pub(crate) fn set_effective(&mut self, value: f64) {
        match self.working.as_mut() {
            Some(working) => *working = value,
            None => self.weight = value,
        }
    }

    pub(crate) fn stage(&mut self, value: f64) {
        self.working = Some(value);
    }
}

/// Borrowed view of one edge with its resolved endpoint ids.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    pub index: EdgeIndex,
    pub source: &'a str,
    pub target: &'a str,
    pub edge: &'a Edge,
}

/// Which endpoint of an edge a per-node test is evaluated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

// ---------------------------------------------------------------------------
// WeightedGraph
// ---------------------------------------------------------------------------

/// A weighted, optionally directed, node-typed graph.
#[derive(Debug, Clone)]
pub struct WeightedGraph {
    pub(crate) graph: DiGraph<Node, Edge>,
    pub(crate) node_map: HashMap<String, NodeIndex>,
    directed: bool,
}

impl Default for WeightedGraph {
    fn default() -> Self {
        Self::new(false)
    }
}

impl WeightedGraph {
    /// An empty graph.
    #[must_use]
    pub fn new(directed: bool) -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            directed,
        }
    }

    /// Insert a node, or merge tags into the existing node with the same id.
    pub(crate) fn upsert_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&node.id) {
            self.graph[idx].absorb(node);
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_map.insert(id, idx);
        idx
    }

    /// Insert a bare node if `id` is unknown.
    pub(crate) fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(Node::new(id));
        self.node_map.insert(id.to_string(), idx);
        idx
    }

    pub(crate) fn add_edge(&mut self, a: NodeIndex, b: NodeIndex, edge: Edge) -> EdgeIndex {
        self.graph.add_edge(a, b, edge)
    }

    #[must_use]
    pub const fn is_directed(&self) -> bool {
        self.directed
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Read-only access to the underlying petgraph structure.
    #[must_use]
    pub const fn petgraph(&self) -> &DiGraph<Node, Edge> {
        &self.graph
    }

    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.graph.edge_references().map(|e| EdgeView {
            index: e.id(),
            source: self.graph[e.source()].id.as_str(),
            target: self.graph[e.target()].id.as_str(),
            edge: e.weight(),
        })
    }

    /// Find the edge joining `a` and `b` (either orientation when undirected).
    #[must_use]
    pub fn find_edge(&self, a: &str, b: &str) -> Option<&Edge> {
        let ia = self.node_index(a)?;
        let ib = self.node_index(b)?;
        let found = self.graph.find_edge(ia, ib).or_else(|| {
            if self.directed {
                None
            } else {
                self.graph.find_edge(ib, ia)
            }
        })?;
        Some(&self.graph[found])
    }

    /// Canonical `(source, target)` key; endpoints sorted when undirected.
    #[must_use]
    pub fn edge_key(&self, index: EdgeIndex) -> Option<(String, String)> {
        let (a, b) = self.graph.edge_endpoints(index)?;
        let a = self.graph[a].id.clone();
        let b = self.graph[b].id.clone();
        if !self.directed && b < a {
            Some((b, a))
        } else {
            Some((a, b))
        }
    }

    /// Edges incident to `node` as seen from `side`.
    ///
    /// Undirected graphs return every incident edge regardless of side.
    /// Directed graphs return out-edges for [`Side::Source`] and in-edges
    /// for [`Side::Target`].
    pub fn incident(&self, node: NodeIndex, side: Side) -> Vec<(EdgeIndex, &Edge)> {
        let out = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.id(), e.weight()));
        let inc = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.id(), e.weight()));
        match (self.directed, side) {
            (true, Side::Source) => out.collect(),
            (true, Side::Target) => inc.collect(),
            (false, _) => out.chain(inc).collect(),
        }
    }

    /// Total degree: every incident arc, both directions.
    #[must_use]
    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Outgoing).count()
            + self.graph.edges_directed(node, Direction::Incoming).count()
    }

    /// Sum of effective weights over all edges.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.graph.edge_weights().map(Edge::effective_weight).sum()
    }

    /// `true` when every node carries a partition tag and no edge joins two
    /// nodes of the same partition.
    #[must_use]
    pub fn is_bipartite(&self) -> bool {
        if self.graph.node_weights().any(|n| n.partition.is_none()) {
            return false;
        }
        self.intra_partition_edges().is_empty()
    }

    /// Keys of edges whose endpoints share a partition tag.
    #[must_use]
    pub fn intra_partition_edges(&self) -> Vec<(String, String)> {
        self.graph
            .edge_references()
            .filter(|e| {
                let a = self.graph[e.source()].partition;
                let b = self.graph[e.target()].partition;
                a.is_some() && a == b
            })
            .filter_map(|e| self.edge_key(e.id()))
            .collect()
    }

    /// Produce a new graph with every edge payload rewritten by `f`.
    #[must_use]
    pub fn map_edges(&self, mut f: impl FnMut(&Edge) -> Edge) -> Self {
        Self {
            graph: self.graph.map(|_, n| n.clone(), |_, e| f(e)),
            node_map: self.node_map.clone(),
            directed: self.directed,
        }
    }

    /// Produce a new graph keeping only nodes and edges the predicates
    /// accept. Edges whose endpoint was dropped are dropped with it.
    #[must_use]
    pub fn retain(
        &self,
        mut keep_node: impl FnMut(NodeIndex, &Node) -> bool,
        mut keep_edge: impl FnMut(EdgeIndex, &Edge) -> bool,
    ) -> Self {
        let graph = self.graph.filter_map(
            |idx, n| keep_node(idx, n).then(|| n.clone()),
            |idx, e| keep_edge(idx, e).then(|| e.clone()),
        );
        let node_map = graph
            .node_indices()
            .map(|idx| (graph[idx].id.clone(), idx))
            .collect();
        Self {
            graph,
            node_map,
            directed: self.directed,
        }
    }

    /// Keep every node and exactly the edges whose mask bit is set.
    ///
    /// `mask` is indexed by [`EdgeIndex::index`].
    #[must_use]
    pub fn with_edge_mask(&self, mask: &[bool]) -> Self {
        self.retain(
            |_, _| true,
            |idx, _| mask.get(idx.index()).copied().unwrap_or(false),
        )
    }

    /// BLAKE3 hash of the sorted edge list (keys and effective weights).
    ///
    /// Stable across insertion order, so an external job cache can key on it.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut rows: Vec<(String, String, u64)> = self
            .graph
            .edge_indices()
            .filter_map(|idx| {
                let (a, b) = self.edge_key(idx)?;
                Some((a, b, self.graph[idx].effective_weight().to_bits()))
            })
            .collect();
        rows.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        hasher.update(if self.directed { b"d" } else { b"u" });
        for (a, b, bits) in &rows {
            hasher.update(a.as_bytes());
            hasher.update(b"\x00");
            hasher.update(b.as_bytes());
            hasher.update(b"\x00");
            hasher.update(&bits.to_le_bytes());
        }
        format!("blake3:{}", hasher.finalize())
    }
}

impl PartialEq for WeightedGraph {
    /// Structural equality: same direction flag, same node payloads by id,
    /// same edge payloads by canonical key. Insertion order is ignored.
    fn eq(&self, other: &Self) -> bool {
        if self.directed != other.directed
            || self.node_count() != other.node_count()
            || self.edge_count() != other.edge_count()
        {
            return false;
        }
        let nodes_match = self
            .graph
            .node_weights()
            .all(|n| other.node(&n.id) == Some(n));
        if !nodes_match {
            return false;
        }
        let theirs: HashMap<(String, String), &Edge> = other
            .graph
            .edge_indices()
            .filter_map(|idx| other.edge_key(idx).map(|k| (k, &other.graph[idx])))
            .collect();
        self.graph.edge_indices().all(|idx| {
            self.edge_key(idx)
                .and_then(|k| theirs.get(&k).copied())
                .is_some_and(|e| e == &self.graph[idx])
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(directed: bool) -> WeightedGraph {
        let mut g = WeightedGraph::new(directed);
        let a = g.ensure_node("A");
        let b = g.ensure_node("B");
        let c = g.ensure_node("C");
        g.add_edge(a, b, Edge::new(1.0));
        g.add_edge(b, c, Edge::new(2.0));
        g.add_edge(c, a, Edge::new(3.0));
        g
    }

    #[test]
    fn undirected_incidence_ignores_side() {
        let g = triangle(false);
        let a = g.node_index("A").expect("A");
        assert_eq!(g.incident(a, Side::Source).len(), 2);
        assert_eq!(g.incident(a, Side::Target).len(), 2);
        assert_eq!(g.degree(a), 2);
    }

    #[test]
    fn directed_incidence_splits_by_side() {
        let g = triangle(true);
        let a = g.node_index("A").expect("A");
        let out = g.incident(a, Side::Source);
        let inc = g.incident(a, Side::Target);
        assert_eq!(out.len(), 1);
        assert_eq!(inc.len(), 1);
        assert!((out[0].1.weight - 1.0).abs() < f64::EPSILON);
        assert!((inc[0].1.weight - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn find_edge_is_orientation_free_when_undirected() {
        let g = triangle(false);
        assert!(g.find_edge("B", "A").is_some());
        let d = triangle(true);
        assert!(d.find_edge("B", "A").is_none());
        assert!(d.find_edge("A", "B").is_some());
    }

    #[test]
    fn retain_drops_dangling_edges_and_rebuilds_index() {
        let g = triangle(false);
        let kept = g.retain(|_, n| n.id != "B", |_, _| true);
        assert_eq!(kept.node_count(), 2);
        assert_eq!(kept.edge_count(), 1);
        assert!(kept.node_index("B").is_none());
        assert!(kept.find_edge("A", "C").is_some());
        // Original untouched.
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn staged_weight_shadows_primary() {
        let mut e = Edge::new(4.0);
        assert!((e.effective_weight() - 4.0).abs() < f64::EPSILON);
        e.stage(9.0);
        assert!((e.effective_weight() - 9.0).abs() < f64::EPSILON);
        e.set_effective(2.0);
        assert!((e.weight - 4.0).abs() < f64::EPSILON, "primary survives");
        assert_eq!(e.working_weight(), Some(2.0));
    }

    #[test]
    fn content_hash_ignores_insertion_order() {
        let g1 = triangle(false);
        let mut g2 = WeightedGraph::new(false);
        let c = g2.ensure_node("C");
        let b = g2.ensure_node("B");
        let a = g2.ensure_node("A");
        g2.add_edge(a, c, Edge::new(3.0));
        g2.add_edge(c, b, Edge::new(2.0));
        g2.add_edge(b, a, Edge::new(1.0));
        assert_eq!(g1.content_hash(), g2.content_hash());
        assert_eq!(g1, g2);
    }

    #[test]
    fn bipartite_detection_requires_tags() {
        let mut g = WeightedGraph::new(false);
        let s = g.upsert_node(Node::new("site").with_partition(0));
        let t = g.upsert_node(Node::new("noun").with_partition(1));
        g.add_edge(s, t, Edge::new(1.0));
        assert!(g.is_bipartite());

        let u = g.ensure_node("untagged");
        g.add_edge(s, u, Edge::new(1.0));
        assert!(!g.is_bipartite());
    }
}
