//! Bisection over the filter parameter to hit a target edge reduction.
//!
//! The statistical filters keep more edges as α grows, so the search runs
//! over α ∈ [0.001, 0.5]: too many edges left lowers the upper bound, too
//! few raises the lower bound. The threshold filter keeps fewer edges as
//! the threshold grows, so a `threshold` base configuration is searched over
//! `[min weight, max weight]` with the bracket moved the other way.
//!
//! The search never fails for an unreached target. It stops early once the
//! relative deviation from the target edge count is within tolerance and
//! otherwise returns the best result seen after `max_iterations` runs.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::backbone::apply::Backboner;
use crate::backbone::config::{Algorithm, BackboningConfig, TargetReduction};
use crate::backbone::stats::BackboningStatistics;
use crate::error::BackboneError;
use crate::filter::ThresholdSpec;
use crate::graph::model::WeightedGraph;

/// Initial α bracket for the statistical filters.
pub const ALPHA_BRACKET: (f64, f64) = (0.001, 0.5);

/// One probe of the search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchTrial {
    pub parameter: f64,
    pub edges: usize,
}

/// How the search went, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub target_reduction: f64,
    pub target_edges: usize,
    pub achieved_reduction: f64,
    pub achieved_edges: usize,
    /// α or threshold of the returned result.
    pub parameter: f64,
    pub relative_deviation: f64,
    pub tolerance: f64,
    pub iterations: u32,
    pub converged: bool,
    pub trials: Vec<SearchTrial>,
}

/// Backbone plus statistics plus search trace.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub graph: WeightedGraph,
    pub statistics: BackboningStatistics,
    pub outcome: SearchOutcome,
}

/// Search for the parameter whose backbone removes `target.ratio` of the
/// edges of `graph`. All other settings come from `base`.
///
/// # Errors
///
/// Configuration errors and backboner errors propagate. An unreached target
/// is not an error.
#[instrument(skip(graph, base), fields(algorithm = base.algorithm.name(), edges = graph.edge_count(), ratio = target.ratio))]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn search_for_target(
    graph: &WeightedGraph,
    base: &BackboningConfig,
    target: TargetReduction,
) -> Result<SearchResult, BackboneError> {
    base.validate()?;
    target.validate()?;

    let total = graph.edge_count();
    let target_edges = (total as f64 * (1.0 - target.ratio)).round() as usize;
    let deviation = |edges: usize| relative_deviation(edges, target_edges, total);

    let Some(bracket) = initial_bracket(graph, &base.algorithm) else {
        // Nothing to search over: run once with the base parameter.
        let (g, mut stats) = Backboner::new(base.clone())?.apply(graph)?;
        stats.target_reduction = Some(target.ratio);
        let edges = g.edge_count();
        let outcome = SearchOutcome {
            target_reduction: target.ratio,
            target_edges,
            achieved_reduction: stats.reduction_ratio(),
            achieved_edges: edges,
            parameter: parameter_of(&base.algorithm),
            relative_deviation: deviation(edges),
            tolerance: target.tolerance,
            iterations: 1,
            converged: deviation(edges) <= target.tolerance,
            trials: vec![SearchTrial {
                parameter: parameter_of(&base.algorithm),
                edges,
            }],
        };
        return Ok(SearchResult {
            graph: g,
            statistics: stats,
            outcome,
        });
    };

    let inverse = matches!(base.algorithm, Algorithm::Threshold { .. });
    let (mut low, mut high) = bracket;
    let mut best: Option<(usize, f64, WeightedGraph, BackboningStatistics)> = None;
    let mut trials = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < target.max_iterations {
        iterations += 1;
        let mid = f64::midpoint(low, high);
        let mut config = base.clone();
        config.algorithm = base.algorithm.with_parameter(mid);
        config.target = None;

        let (g, stats) = Backboner::new(config)?.apply(graph)?;
        let edges = g.edge_count();
        let dev = deviation(edges);
        trials.push(SearchTrial { parameter: mid, edges });
        debug!(iteration = iterations, parameter = mid, edges, target_edges, deviation = dev, "search probe");

        let gap = edges.abs_diff(target_edges);
        if best.as_ref().is_none_or(|(best_gap, ..)| gap < *best_gap) {
            best = Some((gap, mid, g, stats));
        }

        if dev <= target.tolerance {
            converged = true;
            break;
        }
        // Too many edges means filter harder.
        let too_many = edges > target_edges;
        if too_many != inverse {
            high = mid;
        } else {
            low = mid;
        }
    }

    let Some((_, parameter, g, mut stats)) = best else {
        return Err(BackboneError::InvariantViolation(
            "adaptive search ran no iterations".to_string(),
        ));
    };
    stats.target_reduction = Some(target.ratio);
    let achieved_edges = g.edge_count();
    let relative = deviation(achieved_edges);
    if converged {
        info!(parameter, achieved_edges, target_edges, iterations, "target reduction reached");
    } else {
        let note = format!(
            "target reduction {:.3} not reached within {} iterations; best {:.3} at parameter {parameter:.6}",
            target.ratio,
            iterations,
            stats.reduction_ratio()
        );
        warn!("{note}");
        stats.notes.push(note);
    }

    let outcome = SearchOutcome {
        target_reduction: target.ratio,
        target_edges,
        achieved_reduction: stats.reduction_ratio(),
        achieved_edges,
        parameter,
        relative_deviation: relative,
        tolerance: target.tolerance,
        iterations,
        converged,
        trials,
    };
    Ok(SearchResult {
        graph: g,
        statistics: stats,
        outcome,
    })
}

/// `|achieved − target| / target`, or `/ total` when the target is zero.
#[allow(clippy::cast_precision_loss)]
fn relative_deviation(achieved: usize, target: usize, total: usize) -> f64 {
    let gap = achieved.abs_diff(target) as f64;
    if target > 0 {
        gap / target as f64
    } else if total > 0 {
        gap / total as f64
    } else {
        0.0
    }
}

fn initial_bracket(graph: &WeightedGraph, algorithm: &Algorithm) -> Option<(f64, f64)> {
    if graph.edge_count() == 0 {
        return None;
    }
    match algorithm {
        Algorithm::DisparityFilter { .. } | Algorithm::NoiseCorrected { .. } => Some(ALPHA_BRACKET),
        Algorithm::Threshold { .. } => {
            let (lo, hi) = graph
                .edges()
                .map(|v| v.edge.effective_weight())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), w| (lo.min(w), hi.max(w)));
            (lo < hi).then_some((lo, hi))
        }
    }
}

fn parameter_of(algorithm: &Algorithm) -> f64 {
    match algorithm {
        Algorithm::DisparityFilter { alpha } | Algorithm::NoiseCorrected { alpha } => *alpha,
        Algorithm::Threshold { threshold } => match threshold {
            ThresholdSpec::Value(t) => *t,
            ThresholdSpec::Auto(_) => f64::NAN,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::build_graph;

    fn ladder() -> WeightedGraph {
        // Weights 1..=20 on a path: every threshold step removes one edge.
        let rows: Vec<(String, String, f64)> = (0..20)
            .map(|i| (format!("n{i}"), format!("n{}", i + 1), f64::from(i + 1)))
            .collect();
        build_graph(rows).expect("build")
    }

    #[test]
    fn relative_deviation_branches() {
        assert!((relative_deviation(12, 10, 20) - 0.2).abs() < 1e-12);
        assert!((relative_deviation(2, 0, 20) - 0.1).abs() < 1e-12);
        assert!(relative_deviation(0, 0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn threshold_search_moves_inversely() {
        let g = ladder();
        let base = BackboningConfig::new(Algorithm::Threshold {
            threshold: ThresholdSpec::Value(0.0),
        });
        let result = search_for_target(&g, &base, TargetReduction::new(0.5).with_tolerance(0.1)).expect("search");
        assert!(result.outcome.converged, "{:?}", result.outcome);
        assert!((result.outcome.achieved_reduction - 0.5).abs() <= 0.1);
        assert!(result.outcome.parameter > 1.0 && result.outcome.parameter < 20.0);
    }

    #[test]
    fn respects_max_iterations_when_nothing_changes() {
        // A perfect matching: every node has degree 1, so every α keeps all.
        let g = build_graph([("a", "b", 1.0), ("c", "d", 2.0), ("e", "f", 3.0)]).expect("build");
        let result = search_for_target(
            &g,
            &BackboningConfig::default(),
            TargetReduction::new(0.9).with_max_iterations(7),
        )
        .expect("search");
        assert_eq!(result.outcome.iterations, 7);
        assert_eq!(result.outcome.trials.len(), 7);
        assert!(!result.outcome.converged);
        assert_eq!(result.graph.edge_count(), 3);
        assert_eq!(result.statistics.target_reduction, Some(0.9));
        assert_eq!(result.statistics.notes.len(), 1);
    }

    #[test]
    fn empty_graph_runs_once() {
        let result = search_for_target(
            &WeightedGraph::default(),
            &BackboningConfig::default(),
            TargetReduction::new(0.5),
        )
        .expect("search");
        assert_eq!(result.outcome.iterations, 1);
        assert!(result.outcome.converged);
        assert_eq!(result.statistics.original_edges, 0);
    }

    #[test]
    fn invalid_target_is_rejected() {
        let g = ladder();
        let err = search_for_target(&g, &BackboningConfig::default(), TargetReduction::new(1.5)).expect_err("bad ratio");
        assert_eq!(err.code(), "E1003");
    }
}
