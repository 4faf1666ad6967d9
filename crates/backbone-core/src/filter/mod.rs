//! Significance filters.
//!
//! Every filter maps a [`WeightedGraph`] to a keep-mask indexed by
//! `EdgeIndex::index()`. Filters never build graphs themselves; the
//! backboner applies the mask and the post-filters.
//!
//! | Filter | Locality | Cost |
//! |--------|----------|------|
//! | [`disparity`] | per node | `O(E)` |
//! | [`noise_corrected`] | global strengths | `O(E)`, heavier constant |
//! | [`threshold`] | global quantile when auto | `O(E log E)` when auto |
//!
//! Only filters whose decision depends on nothing beyond an edge's own
//! component report [`Algorithm::is_component_local`]; the backboner relies
//! on that to chunk large graphs.

pub mod disparity;
#[cfg(feature = "noise-corrected")]
pub mod noise_corrected;
pub mod threshold;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backbone::config::Algorithm;
use crate::error::BackboneError;
use crate::graph::model::{Side, WeightedGraph};

pub use disparity::{disparity_filter, disparity_scores};
#[cfg(feature = "noise-corrected")]
pub use noise_corrected::{noise_corrected_filter, noise_corrected_scores};
pub use threshold::{AutoThreshold, ThresholdOutcome, ThresholdSpec, threshold_filter};

/// Which endpoints of a bipartite graph take part in the disparity test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BipartiteMode {
    /// Both endpoints vote.
    #[default]
    Symmetric,
    /// Only nodes tagged with this partition vote. Degree ≤ 1 retention
    /// still applies on every node.
    FromPartition(u8),
}

impl BipartiteMode {
    /// Whether a node with this partition tag casts a score vote.
    #[must_use]
    pub fn votes(self, partition: Option<u8>) -> bool {
        match self {
            Self::Symmetric => true,
            Self::FromPartition(p) => partition == Some(p),
        }
    }
}

/// Degree and strength per node, as seen from one [`Side`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalStats {
    pub degree: Vec<usize>,
    pub strength: Vec<f64>,
}

impl LocalStats {
    /// Tabulate over effective weights. Indexed by `NodeIndex::index()`.
    #[must_use]
    pub fn compute(graph: &WeightedGraph, side: Side) -> Self {
        let g = graph.petgraph();
        let mut stats = Self {
            degree: Vec::with_capacity(g.node_count()),
            strength: Vec::with_capacity(g.node_count()),
        };
        for node in g.node_indices() {
            let incident = graph.incident(node, side);
            stats.degree.push(incident.len());
            stats
                .strength
                .push(incident.iter().map(|(_, e)| e.effective_weight()).sum());
        }
        stats
    }
}

/// Keep-mask plus anything the caller should report about how it was made.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub keep: Vec<bool>,
    /// Threshold actually applied (threshold filter only).
    pub threshold_used: Option<f64>,
    /// Human-readable notes on fallbacks taken.
    pub notes: Vec<String>,
}

impl FilterOutcome {
    const fn plain(keep: Vec<bool>) -> Self {
        Self {
            keep,
            threshold_used: None,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn kept(&self) -> usize {
        self.keep.iter().filter(|&&k| k).count()
    }
}

/// Run the filter `algorithm` selects.
///
/// # Errors
///
/// Returns [`BackboneError::UnsupportedAlgorithm`] when the algorithm is not
/// compiled into this build.
pub fn run_filter(
    graph: &WeightedGraph,
    algorithm: &Algorithm,
    bipartite: BipartiteMode,
) -> Result<FilterOutcome, BackboneError> {
    let outcome = match *algorithm {
        Algorithm::DisparityFilter { alpha } => {
            FilterOutcome::plain(disparity_filter(graph, alpha, bipartite))
        }
        Algorithm::NoiseCorrected { alpha } => noise_corrected(graph, alpha)?,
        Algorithm::Threshold { threshold } => {
            let out = threshold_filter(graph, threshold);
            let notes = out
                .derived_from
                .map(|rule| {
                    vec![format!(
                        "no threshold supplied; using {} of edge weights ({})",
                        rule.as_str(),
                        out.threshold
                    )]
                })
                .unwrap_or_default();
            FilterOutcome {
                keep: out.keep,
                threshold_used: Some(out.threshold),
                notes,
            }
        }
    };
    debug!(
        algorithm = algorithm.name(),
        edges = graph.edge_count(),
        kept = outcome.kept(),
        "filter pass"
    );
    Ok(outcome)
}

#[cfg(feature = "noise-corrected")]
#[allow(clippy::unnecessary_wraps)]
fn noise_corrected(graph: &WeightedGraph, alpha: f64) -> Result<FilterOutcome, BackboneError> {
    Ok(FilterOutcome::plain(noise_corrected_filter(graph, alpha)))
}

#[cfg(not(feature = "noise-corrected"))]
fn noise_corrected(_graph: &WeightedGraph, _alpha: f64) -> Result<FilterOutcome, BackboneError> {
    Err(BackboneError::UnsupportedAlgorithm(
        "noise_corrected (built without the `noise-corrected` feature)".to_string(),
    ))
}
