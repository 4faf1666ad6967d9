use serde::{Deserialize, Serialize};

use crate::backbone::config::Algorithm;
use crate::graph::model::WeightedGraph;

/// Before/after summary of one backboning run.
///
/// Percentages are in `[0, 100]`. Weight sums use effective weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackboningStatistics {
    pub algorithm: Algorithm,
    pub original_nodes: usize,
    pub original_edges: usize,
    pub backbone_nodes: usize,
    pub backbone_edges: usize,
    pub edges_removed: usize,
    pub reduction_pct: f64,
    pub original_weight: f64,
    pub backbone_weight: f64,
    pub weight_retention_pct: f64,
    pub avg_degree_before: f64,
    pub avg_degree_after: f64,
    /// Threshold actually applied, for the threshold filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_used: Option<f64>,
    /// Requested reduction ratio, when the run came from the adaptive search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_reduction: Option<f64>,
    /// Number of components processed independently, when chunked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunked_components: Option<usize>,
    pub duration_ms: u64,
    /// Fallbacks taken during the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl BackboningStatistics {
    /// All-zero statistics for an empty input.
    #[must_use]
    pub const fn empty(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            original_nodes: 0,
            original_edges: 0,
            backbone_nodes: 0,
            backbone_edges: 0,
            edges_removed: 0,
            reduction_pct: 0.0,
            original_weight: 0.0,
            backbone_weight: 0.0,
            weight_retention_pct: 0.0,
            avg_degree_before: 0.0,
            avg_degree_after: 0.0,
            threshold_used: None,
            target_reduction: None,
            chunked_components: None,
            duration_ms: 0,
            notes: Vec::new(),
        }
    }

    /// Diff `backbone` against `original`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn diff(algorithm: Algorithm, original: &WeightedGraph, backbone: &WeightedGraph) -> Self {
        let original_edges = original.edge_count();
        let backbone_edges = backbone.edge_count();
        let edges_removed = original_edges.saturating_sub(backbone_edges);
        let original_weight = original.total_weight();
        let backbone_weight = backbone.total_weight();

        Self {
            algorithm,
            original_nodes: original.node_count(),
            original_edges,
            backbone_nodes: backbone.node_count(),
            backbone_edges,
            edges_removed,
            reduction_pct: percent(edges_removed as f64, original_edges as f64),
            original_weight,
            backbone_weight,
            weight_retention_pct: percent(backbone_weight, original_weight),
            avg_degree_before: average_degree(original),
            avg_degree_after: average_degree(backbone),
            threshold_used: None,
            target_reduction: None,
            chunked_components: None,
            duration_ms: 0,
            notes: Vec::new(),
        }
    }

    /// Fraction of edges removed, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_edges == 0 {
            0.0
        } else {
            self.edges_removed as f64 / self.original_edges as f64
        }
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { 100.0 * part / whole }
}

#[allow(clippy::cast_precision_loss)]
fn average_degree(graph: &WeightedGraph) -> f64 {
    if graph.node_count() == 0 {
        0.0
    } else {
        2.0 * graph.edge_count() as f64 / graph.node_count() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::build_graph;

    #[test]
    fn diff_counts_and_ratios() {
        let original = build_graph([("a", "b", 3.0), ("b", "c", 1.0)]).expect("build");
        let backbone = build_graph([("a", "b", 3.0)]).expect("build");
        let s = BackboningStatistics::diff(Algorithm::default(), &original, &backbone);
        assert_eq!(s.edges_removed, 1);
        assert!((s.reduction_pct - 50.0).abs() < 1e-12);
        assert!((s.reduction_ratio() - 0.5).abs() < 1e-12);
        assert!((s.weight_retention_pct - 75.0).abs() < 1e-12);
        assert!((s.avg_degree_before - 4.0 / 3.0).abs() < 1e-12);
        assert!((s.avg_degree_after - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_original_reports_zero_retention() {
        let g = build_graph([("a", "b", 0.0)]).expect("build");
        let s = BackboningStatistics::diff(Algorithm::default(), &g, &g);
        assert!(s.weight_retention_pct.abs() < f64::EPSILON);
    }
}
