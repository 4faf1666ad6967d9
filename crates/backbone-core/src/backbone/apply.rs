//! The backboner: filter, post-filters, statistics.
//!
//! # Stages
//!
//! 1. Reject edges whose effective weight is not finite.
//! 2. Empty input short-circuits to an empty output.
//! 3. Run the configured filter (per component on large graphs).
//! 4. Apply the `min_weight` floor.
//! 5. Apply the `min_degree` floor once, on post-filter degrees.
//! 6. Drop isolated nodes unless `retain_disconnected`.
//! 7. Diff against the input and assert the backbone did not grow.

use std::time::Instant;

use fixedbitset::FixedBitSet;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::backbone::config::BackboningConfig;
use crate::backbone::stats::BackboningStatistics;
use crate::error::{BackboneError, InputIssue};
use crate::filter::{FilterOutcome, run_filter};
use crate::graph::components::{component_count, split_components};
use crate::graph::model::WeightedGraph;

/// Runs one backboning job against a validated configuration.
#[derive(Debug, Clone)]
pub struct Backboner {
    config: BackboningConfig,
}

impl Backboner {
    /// # Errors
    ///
    /// Returns [`BackboneError::InvalidConfig`] when the configuration fails
    /// [`BackboningConfig::validate`].
    pub fn new(config: BackboningConfig) -> Result<Self, BackboneError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &BackboningConfig {
        &self.config
    }

    /// Backbone `graph`. The input is left untouched.
    ///
    /// # Errors
    ///
    /// - [`BackboneError::MalformedInput`] if an edge weight is not finite.
    /// - [`BackboneError::UnsupportedAlgorithm`] if the filter is not built in.
    /// - [`BackboneError::InvariantViolation`] if the result is larger than
    ///   the input.
    #[instrument(skip(self, graph), fields(algorithm = self.config.algorithm.name(), nodes = graph.node_count(), edges = graph.edge_count()))]
    pub fn apply(&self, graph: &WeightedGraph) -> Result<(WeightedGraph, BackboningStatistics), BackboneError> {
        let started = Instant::now();
        check_weights(graph)?;

        if graph.is_empty() {
            debug!("empty input graph");
            let mut stats = BackboningStatistics::empty(self.config.algorithm);
            stats.duration_ms = elapsed_ms(started);
            return Ok((WeightedGraph::new(graph.is_directed()), stats));
        }

        let (outcome, chunks) = self.keep_mask(graph)?;
        let mut keep = outcome.keep;

        if let Some(floor) = self.config.min_weight {
            for (k, e) in keep.iter_mut().zip(graph.petgraph().edge_weights()) {
                *k = *k && e.effective_weight() >= floor;
            }
        }
        let mut backbone = graph.with_edge_mask(&keep);
        debug!(edges = backbone.edge_count(), "after filter and weight floor");

        if let Some(floor) = self.config.min_degree {
            let alive = nodes_with_degree(&backbone, floor);
            backbone = backbone.retain(|idx, _| alive.contains(idx.index()), |_, _| true);
            debug!(
                floor,
                nodes = backbone.node_count(),
                edges = backbone.edge_count(),
                "after degree floor"
            );
        }

        if !self.config.retain_disconnected {
            let connected = nodes_with_degree(&backbone, 1);
            backbone = backbone.retain(|idx, _| connected.contains(idx.index()), |_, _| true);
        }

        let mut stats = BackboningStatistics::diff(self.config.algorithm, graph, &backbone);
        stats.threshold_used = outcome.threshold_used;
        stats.notes = outcome.notes;
        stats.chunked_components = chunks;
        stats.duration_ms = elapsed_ms(started);

        if stats.backbone_edges > stats.original_edges || stats.backbone_nodes > stats.original_nodes {
            return Err(BackboneError::InvariantViolation(format!(
                "backbone has {} nodes / {} edges, input had {} / {}",
                stats.backbone_nodes, stats.backbone_edges, stats.original_nodes, stats.original_edges
            )));
        }

        info!(
            kept = stats.backbone_edges,
            removed = stats.edges_removed,
            reduction_pct = stats.reduction_pct,
            duration_ms = stats.duration_ms,
            "backbone extracted"
        );
        Ok((backbone, stats))
    }

    /// Filter mask for the whole graph, chunked by component when the graph
    /// is large and the filter is component-local. The second value is the
    /// number of chunks when chunking happened.
    fn keep_mask(&self, graph: &WeightedGraph) -> Result<(FilterOutcome, Option<usize>), BackboneError> {
        let algorithm = &self.config.algorithm;
        let bipartite = self.config.bipartite;
        let chunking = &self.config.chunking;

        if graph.edge_count() <= chunking.edge_threshold || !algorithm.is_component_local() {
            return Ok((run_filter(graph, algorithm, bipartite)?, None));
        }
        if component_count(graph) <= 1 {
            return Ok((run_filter(graph, algorithm, bipartite)?, None));
        }

        let slices = split_components(graph);
        let run = || {
            slices
                .par_iter()
                .map(|slice| run_filter(&slice.graph, algorithm, bipartite))
                .collect::<Result<Vec<_>, _>>()
        };
        let outcomes = match chunking.max_workers {
            Some(workers) => match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => pool.install(run)?,
                Err(err) => {
                    warn!(%err, "could not build worker pool; using the global pool");
                    run()?
                }
            },
            None => run()?,
        };

        let mut keep = vec![false; graph.edge_count()];
        let mut threshold_used = None;
        for (slice, outcome) in slices.iter().zip(outcomes) {
            threshold_used = threshold_used.or(outcome.threshold_used);
            for (origin, k) in slice.origin.iter().zip(outcome.keep) {
                keep[origin.index()] = k;
            }
        }
        debug!(components = slices.len(), "chunked filter pass");

        Ok((
            FilterOutcome {
                keep,
                threshold_used,
                notes: Vec::new(),
            },
            Some(slices.len()),
        ))
    }
}

/// Nodes of `graph` whose degree is at least `floor`.
fn nodes_with_degree(graph: &WeightedGraph, floor: usize) -> FixedBitSet {
    let mut set = FixedBitSet::with_capacity(graph.node_count());
    for node in graph.petgraph().node_indices() {
        if graph.degree(node) >= floor {
            set.insert(node.index());
        }
    }
    set
}

fn check_weights(graph: &WeightedGraph) -> Result<(), BackboneError> {
    let issues: Vec<InputIssue> = graph
        .edges()
        .filter(|view| !view.edge.effective_weight().is_finite())
        .map(|view| InputIssue {
            row: view.index.index(),
            reason: format!(
                "edge {} -> {} has non-finite weight {}",
                view.source,
                view.target,
                view.edge.effective_weight()
            ),
        })
        .collect();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(BackboneError::MalformedInput { issues })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
