#![forbid(unsafe_code)]
//! backbone-core library.
//!
//! Statistical backboning of weighted graphs: keep the edges that are
//! significant relative to their endpoints' local weight distribution and
//! report how much structure survived.
//!
//! # Entry points
//!
//! - [`build_graph`]: edge rows → [`WeightedGraph`]
//! - [`run_backboning`]: graph + [`BackboningConfig`] → backbone + statistics
//! - [`run_adaptive_backboning`]: the same, searching α for a target reduction
//! - [`validate`]: original + backbone → [`ValidationReport`]
//!
//! # Conventions
//!
//! - **Errors**: every fallible operation returns [`BackboneError`].
//!   Degenerate inputs (empty graphs, zero-weight nodes, zero-variance
//!   weights) have defined outputs and never fail.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`). Reported
//!   fallbacks are logged at `warn`.
//! - **Values**: graphs are never mutated in place; every stage returns a
//!   new graph.

pub mod backbone;
pub mod error;
pub mod filter;
pub mod graph;
pub mod report;
pub mod validate;
pub mod weight;

use tracing::instrument;

pub use backbone::{
    Algorithm, Backboner, BackboningConfig, BackboningStatistics, SearchOutcome, SearchResult,
    TargetReduction, search_for_target,
};
pub use error::{BackboneError, InputIssue};
pub use filter::{AutoThreshold, BipartiteMode, ThresholdSpec};
pub use graph::{EdgeRecord, GraphBuilder, GraphDocument, Node, WeightedGraph, build_graph};
pub use report::{BackboneReport, ReportBuilder};
pub use validate::{ValidationReport, Validator, ValidatorConfig, WeightKey};

/// Run one backboning job.
///
/// # Errors
///
/// See [`Backboner::apply`]; configuration errors surface as
/// [`BackboneError::InvalidConfig`].
#[instrument(skip_all)]
pub fn run_backboning(
    graph: &WeightedGraph,
    config: &BackboningConfig,
) -> Result<(WeightedGraph, BackboningStatistics), BackboneError> {
    Backboner::new(config.clone())?.apply(graph)
}

/// Run one backboning job with α tuned to remove `target_reduction` of the
/// edges. The achieved reduction is in the returned statistics; missing the
/// target is not an error.
///
/// # Errors
///
/// As [`run_backboning`], plus [`BackboneError::InvalidConfig`] for a target
/// outside `[0, 1)`, a non-positive tolerance, or zero iterations.
pub fn run_adaptive_backboning(
    graph: &WeightedGraph,
    base_config: &BackboningConfig,
    target_reduction: f64,
    tolerance: f64,
    max_iterations: u32,
) -> Result<(WeightedGraph, BackboningStatistics), BackboneError> {
    let target = TargetReduction::new(target_reduction)
        .with_tolerance(tolerance)
        .with_max_iterations(max_iterations);
    let result = search_for_target(graph, base_config, target)?;
    Ok((result.graph, result.statistics))
}

/// Validate `backbone` against `original` with default settings (effective
/// weights, 1,000 sampled pairs, fixed seed).
#[must_use]
pub fn validate(original: &WeightedGraph, backbone: &WeightedGraph) -> ValidationReport {
    Validator::default().validate(original, backbone)
}
