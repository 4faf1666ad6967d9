//! Graph construction from `(source, target, weight, attributes)` rows.
//!
//! # Validation
//!
//! - **Non-finite weights** (NaN, ±∞): an error in strict mode; otherwise
//!   clamped to `0.0` and counted in [`BuildReport::non_finite_clamped`].
//! - **Invalid identifiers** (empty or whitespace-only): an error in strict
//!   mode; otherwise the row is skipped and counted.
//! - **Missing weights** default to `1.0`.
//! - **Self-loops** are skipped unless [`GraphBuilder::allow_self_loops`]
//!   is set. They are never an error.
//!
//! Strict mode collects every offending row before failing, so callers see
//! the full list in one [`BackboneError::MalformedInput`].
//!
//! ## Parallel edges
//!
//! Rows repeating an already-seen pair are merged per [`DuplicatePolicy`].
//! For undirected graphs `(a, b)` and `(b, a)` are the same pair.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{BackboneError, InputIssue};
use crate::graph::model::{Attributes, Edge, Node, WeightedGraph};

/// Default weight for rows that omit one.
pub const DEFAULT_WEIGHT: f64 = 1.0;

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// One input edge row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl EdgeRecord {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: Some(weight),
            attributes: Attributes::new(),
        }
    }

    /// A row with no weight; the builder assigns [`DEFAULT_WEIGHT`].
    #[must_use]
    pub fn unweighted(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: None,
            attributes: Attributes::new(),
        }
    }

    /// Attach an attribute (numeric values feed [`crate::weight::combine`]).
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl<S: Into<String>, T: Into<String>> From<(S, T, f64)> for EdgeRecord {
    fn from((source, target, weight): (S, T, f64)) -> Self {
        Self::new(source, target, weight)
    }
}

/// How rows repeating an existing node pair are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Add the weights; attributes missing on the first row are filled in.
    #[default]
    Sum,
    /// Keep the heavier row entirely.
    Max,
    /// Keep the first row, ignore the rest.
    KeepFirst,
}

// ---------------------------------------------------------------------------
// BuildReport
// ---------------------------------------------------------------------------

/// Counters describing what the builder did to its input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Rows received.
    pub rows: usize,
    /// Nodes in the built graph.
    pub nodes: usize,
    /// Edges in the built graph.
    pub edges: usize,
    /// Rows folded into an earlier edge between the same pair.
    pub duplicates_merged: usize,
    /// Rows without a weight that received [`DEFAULT_WEIGHT`].
    pub defaulted_weights: usize,
    /// Non-finite weights clamped to zero (lenient mode).
    pub non_finite_clamped: usize,
    /// Self-loop rows dropped.
    pub self_loops_skipped: usize,
    /// Rows dropped for an empty node identifier (lenient mode).
    pub invalid_ids_skipped: usize,
}

impl BuildReport {
    /// Rows that were altered or dropped rather than taken as-is.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.non_finite_clamped + self.self_loops_skipped + self.invalid_ids_skipped
    }
}

// ---------------------------------------------------------------------------
// GraphBuilder
// ---------------------------------------------------------------------------

/// Assembles a validated [`WeightedGraph`] from edge rows.
///
/// ```rust,ignore
/// let graph = GraphBuilder::new()
///     .strict(true)
///     .duplicates(DuplicatePolicy::Max)
///     .node(Node::new("example.org").with_type("source").with_partition(0))
///     .build(rows)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    directed: bool,
    strict: bool,
    allow_self_loops: bool,
    duplicates: DuplicatePolicy,
    nodes: Vec<Node>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Fail on non-finite weights and invalid identifiers instead of
    /// repairing them.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub const fn allow_self_loops(mut self, allow: bool) -> Self {
        self.allow_self_loops = allow;
        self
    }

    #[must_use]
    pub const fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Declare a node ahead of the edges (type tag, partition, attributes).
    /// Nodes declared here survive even when no edge references them.
    #[must_use]
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    #[must_use]
    pub fn nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Build the graph, discarding the report.
    ///
    /// # Errors
    ///
    /// Returns [`BackboneError::MalformedInput`] in strict mode when any row
    /// carries a non-finite weight or an invalid node identifier.
    pub fn build<I, R>(&self, records: I) -> Result<WeightedGraph, BackboneError>
    where
        I: IntoIterator<Item = R>,
        R: Into<EdgeRecord>,
    {
        self.build_with_report(records).map(|(graph, _)| graph)
    }

    /// Build the graph and return the counters describing repairs.
    ///
    /// # Errors
    ///
    /// Same as [`GraphBuilder::build`].
    #[instrument(skip(self, records), fields(strict = self.strict, directed = self.directed))]
    pub fn build_with_report<I, R>(
        &self,
        records: I,
    ) -> Result<(WeightedGraph, BuildReport), BackboneError>
    where
        I: IntoIterator<Item = R>,
        R: Into<EdgeRecord>,
    {
        let mut graph = WeightedGraph::new(self.directed);
        let mut report = BuildReport::default();
        let mut issues: Vec<InputIssue> = Vec::new();

        for node in &self.nodes {
            if is_valid_id(&node.id) {
                graph.upsert_node(node.clone());
            } else if self.strict {
                issues.push(InputIssue {
                    row: 0,
                    reason: format!("declared node has invalid id {:?}", node.id),
                });
            } else {
                report.invalid_ids_skipped += 1;
            }
        }

        let mut pairs: HashMap<(NodeIndex, NodeIndex), EdgeIndex> = HashMap::new();

        for (row, record) in records.into_iter().map(Into::into).enumerate() {
            report.rows += 1;

            let ids_ok = is_valid_id(&record.source) && is_valid_id(&record.target);
            if !ids_ok {
                if self.strict {
                    issues.push(InputIssue {
                        row,
                        reason: format!(
                            "invalid node identifier in ({:?}, {:?})",
                            record.source, record.target
                        ),
                    });
                } else {
                    report.invalid_ids_skipped += 1;
                }
                continue;
            }

            let weight = match record.weight {
                None => {
                    report.defaulted_weights += 1;
                    DEFAULT_WEIGHT
                }
                Some(w) if w.is_finite() => w,
                Some(w) => {
                    if self.strict {
                        issues.push(InputIssue {
                            row,
                            reason: format!("non-finite weight {w}"),
                        });
                        continue;
                    }
                    report.non_finite_clamped += 1;
                    0.0
                }
            };

            if record.source == record.target && !self.allow_self_loops {
                report.self_loops_skipped += 1;
                continue;
            }

            // Once strict mode has failed there is nothing to build; keep
            // scanning only to collect the remaining issues.
            if !issues.is_empty() {
                continue;
            }

            let a = graph.ensure_node(&record.source);
            let b = graph.ensure_node(&record.target);
            let key = if self.directed || a <= b { (a, b) } else { (b, a) };

            match pairs.get(&key) {
                Some(&existing) => {
                    report.duplicates_merged += 1;
                    merge_duplicate(&mut graph.graph[existing], weight, record.attributes, self.duplicates);
                }
                None => {
                    let idx = graph.add_edge(a, b, Edge::with_attributes(weight, record.attributes));
                    pairs.insert(key, idx);
                }
            }
        }

        if !issues.is_empty() {
            return Err(BackboneError::MalformedInput { issues });
        }

        report.nodes = graph.node_count();
        report.edges = graph.edge_count();

        if report.warning_count() > 0 {
            warn!(
                non_finite_clamped = report.non_finite_clamped,
                self_loops_skipped = report.self_loops_skipped,
                invalid_ids_skipped = report.invalid_ids_skipped,
                "graph input repaired"
            );
        }
        debug!(
            rows = report.rows,
            nodes = report.nodes,
            edges = report.edges,
            duplicates = report.duplicates_merged,
            "graph built"
        );

        Ok((graph, report))
    }
}

/// Build an undirected graph with default (lenient, summing) settings.
///
/// # Errors
///
/// Never fails in lenient mode; the `Result` mirrors [`GraphBuilder::build`].
pub fn build_graph<I, R>(records: I) -> Result<WeightedGraph, BackboneError>
where
    I: IntoIterator<Item = R>,
    R: Into<EdgeRecord>,
{
    GraphBuilder::new().build(records)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn is_valid_id(id: &str) -> bool {
    !id.trim().is_empty()
}

fn merge_duplicate(existing: &mut Edge, weight: f64, attributes: Attributes, policy: DuplicatePolicy) {
    match policy {
        DuplicatePolicy::Sum => {
            existing.weight += weight;
            for (key, value) in attributes {
                existing.attributes.entry(key).or_insert(value);
            }
        }
        DuplicatePolicy::Max => {
            if weight > existing.weight {
                *existing = Edge::with_attributes(weight, attributes);
            }
        }
        DuplicatePolicy::KeepFirst => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_of(g: &WeightedGraph, a: &str, b: &str) -> f64 {
        g.find_edge(a, b).expect("edge present").weight
    }

    #[test]
    fn empty_input_produces_empty_graph() {
        let (g, report) = GraphBuilder::new()
            .build_with_report(Vec::<EdgeRecord>::new())
            .expect("build");
        assert!(g.is_empty());
        assert_eq!(report, BuildReport::default());
    }

    #[test]
    fn nodes_inserted_on_first_reference() {
        let g = build_graph([("a", "b", 1.0), ("b", "c", 2.0)]).expect("build");
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert!(g.node_index("c").is_some());
    }

    #[test]
    fn missing_weight_defaults_to_one() {
        let (g, report) = GraphBuilder::new()
            .build_with_report([EdgeRecord::unweighted("a", "b")])
            .expect("build");
        assert!((weight_of(&g, "a", "b") - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.defaulted_weights, 1);
    }

    #[test]
    fn strict_mode_reports_every_bad_row() {
        let rows = vec![
            EdgeRecord::new("a", "b", f64::NAN),
            EdgeRecord::new("b", "c", 1.0),
            EdgeRecord::new("c", "d", f64::INFINITY),
            EdgeRecord::new("", "d", 1.0),
        ];
        let err = GraphBuilder::new().strict(true).build(rows).expect_err("strict");
        match err {
            BackboneError::MalformedInput { issues } => {
                let rows: Vec<usize> = issues.iter().map(|i| i.row).collect();
                assert_eq!(rows, vec![0, 2, 3]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lenient_mode_clamps_non_finite_to_zero() {
        let (g, report) = GraphBuilder::new()
            .build_with_report([EdgeRecord::new("a", "b", f64::NAN), EdgeRecord::new("b", "c", f64::NEG_INFINITY)])
            .expect("lenient build");
        assert_eq!(report.non_finite_clamped, 2);
        assert_eq!(report.warning_count(), 2);
        assert!(weight_of(&g, "a", "b").abs() < f64::EPSILON);
        assert!(weight_of(&g, "b", "c").abs() < f64::EPSILON);
    }

    #[test]
    fn lenient_mode_skips_blank_ids() {
        let (g, report) = GraphBuilder::new()
            .build_with_report([("  ", "b", 1.0), ("a", "b", 1.0)])
            .expect("build");
        assert_eq!(report.invalid_ids_skipped, 1);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn self_loops_skipped_unless_permitted() {
        let (g, report) = GraphBuilder::new()
            .build_with_report([("a", "a", 1.0), ("a", "b", 1.0)])
            .expect("build");
        assert_eq!(report.self_loops_skipped, 1);
        assert_eq!(g.edge_count(), 1);

        let g = GraphBuilder::new()
            .allow_self_loops(true)
            .build([("a", "a", 1.0)])
            .expect("build");
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn duplicate_policies() {
        let rows = || vec![("a", "b", 2.0), ("b", "a", 5.0), ("a", "b", 1.0)];

        let sum = GraphBuilder::new().build(rows()).expect("sum");
        assert_eq!(sum.edge_count(), 1);
        assert!((weight_of(&sum, "a", "b") - 8.0).abs() < f64::EPSILON);

        let max = GraphBuilder::new()
            .duplicates(DuplicatePolicy::Max)
            .build(rows())
            .expect("max");
        assert!((weight_of(&max, "a", "b") - 5.0).abs() < f64::EPSILON);

        let first = GraphBuilder::new()
            .duplicates(DuplicatePolicy::KeepFirst)
            .build(rows())
            .expect("first");
        assert!((weight_of(&first, "a", "b") - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn directed_graphs_keep_antiparallel_edges() {
        let g = GraphBuilder::new()
            .directed(true)
            .build([("a", "b", 2.0), ("b", "a", 5.0)])
            .expect("build");
        assert_eq!(g.edge_count(), 2);
        assert!((weight_of(&g, "b", "a") - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sum_policy_fills_missing_attributes() {
        let rows = vec![
            EdgeRecord::new("a", "b", 1.0).with_attribute("tf", 3.0),
            EdgeRecord::new("a", "b", 1.0)
                .with_attribute("tf", 9.0)
                .with_attribute("idf", 0.5),
        ];
        let g = build_graph(rows).expect("build");
        let e = g.find_edge("a", "b").expect("edge");
        assert_eq!(e.numeric_attribute("tf"), Some(3.0));
        assert_eq!(e.numeric_attribute("idf"), Some(0.5));
    }

    #[test]
    fn declared_nodes_keep_tags_and_isolates() {
        let g = GraphBuilder::new()
            .node(Node::new("site").with_type("website").with_partition(0))
            .node(Node::new("lonely").with_type("noun").with_partition(1))
            .build([("site", "noun", 1.0)])
            .expect("build");
        assert_eq!(g.node_count(), 3);
        let site = g.node("site").expect("site");
        assert_eq!(site.node_type.as_deref(), Some("website"));
        assert_eq!(site.partition, Some(0));
        assert!(g.node("lonely").is_some());
    }
}
