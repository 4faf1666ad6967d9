//! Weight models: map raw edge weights onto a canonical, comparable scale.
//!
//! Every function here is pure. It reads and writes each edge's *effective*
//! weight (the staged working weight when [`combine`] produced one, the
//! primary weight otherwise) and returns a new graph.
//!
//! # Degenerate inputs
//!
//! | Input                      | Result                             |
//! |----------------------------|------------------------------------|
//! | empty graph                | returned unchanged                 |
//! | min-max with zero range    | every weight becomes `1.0`         |
//! | z-score with zero variance | every weight becomes `0.0`         |
//! | log1p of a negative weight | treated as `0.0` (result `0.0`)    |
//! | rank below zero            | treated as rank `0` (result `1.0`) |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::BackboneError;
use crate::graph::model::{Edge, WeightedGraph};

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Distribution-wide normalization applied to every edge weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMethod {
    MinMax,
    ZScore,
    Log1p,
    #[default]
    Identity,
}

impl NormalizeMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MinMax => "min_max",
            Self::ZScore => "z_score",
            Self::Log1p => "log1p",
            Self::Identity => "identity",
        }
    }
}

impl fmt::Display for NormalizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizeMethod {
    type Err = BackboneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min_max" | "minmax" => Ok(Self::MinMax),
            "z_score" | "zscore" => Ok(Self::ZScore),
            "log1p" | "log" => Ok(Self::Log1p),
            "identity" | "none" => Ok(Self::Identity),
            other => Err(BackboneError::InvalidConfig(format!(
                "unknown normalization method {other:?}"
            ))),
        }
    }
}

/// Rewrite every effective weight with `method`, computed over the full
/// edge-weight distribution.
#[must_use]
#[instrument(skip(graph), fields(edges = graph.edge_count()))]
pub fn normalize(graph: &WeightedGraph, method: NormalizeMethod) -> WeightedGraph {
    if graph.edge_count() == 0 || method == NormalizeMethod::Identity {
        return graph.clone();
    }

    let weights: Vec<f64> = graph.edges().map(|v| v.edge.effective_weight()).collect();

    match method {
        NormalizeMethod::MinMax => {
            let (min, max) = min_max(&weights);
            let range = max - min;
            if range <= 0.0 {
                debug!("min-max range is zero; all weights set to 1.0");
                return rewrite(graph, |_| 1.0);
            }
            rewrite(graph, |w| ((w - min) / range).clamp(0.0, 1.0))
        }
        NormalizeMethod::ZScore => {
            let (mean, std_dev) = mean_std(&weights);
            if std_dev <= 0.0 {
                debug!("z-score variance is zero; all weights set to 0.0");
                return rewrite(graph, |_| 0.0);
            }
            rewrite(graph, |w| (w - mean) / std_dev)
        }
        NormalizeMethod::Log1p => rewrite(graph, |w| w.max(0.0).ln_1p()),
        NormalizeMethod::Identity => graph.clone(),
    }
}

// ---------------------------------------------------------------------------
// combine
// ---------------------------------------------------------------------------

/// How several numeric attributes fold into one working weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    Product,
    Sum,
    Average,
    Max,
    Min,
}

impl FromStr for Combinator {
    type Err = BackboneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(Self::Product),
            "sum" => Ok(Self::Sum),
            "average" | "mean" => Ok(Self::Average),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            other => Err(BackboneError::InvalidConfig(format!(
                "unknown combinator {other:?}"
            ))),
        }
    }
}

impl Combinator {
    #[allow(clippy::cast_precision_loss)]
    fn fold(self, values: &[f64]) -> f64 {
        match self {
            Self::Product => values.iter().product(),
            Self::Sum => values.iter().sum(),
            Self::Average => values.iter().sum::<f64>() / values.len() as f64,
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// Fold the named numeric attributes of each edge into a staged working
/// weight. The primary weight and attribute map are left untouched.
///
/// `"weight"` names the primary weight. Missing or non-numeric attributes
/// are skipped; an edge with none of them present keeps its current
/// effective weight and stages nothing.
#[must_use]
#[instrument(skip(graph), fields(edges = graph.edge_count()))]
pub fn combine(graph: &WeightedGraph, attributes: &[&str], combinator: Combinator) -> WeightedGraph {
    graph.map_edges(|edge| {
        let values: Vec<f64> = attributes
            .iter()
            .filter_map(|key| edge.numeric_attribute(key))
            .filter(|v| v.is_finite())
            .collect();
        let mut out = edge.clone();
        if !values.is_empty() {
            out.stage(combinator.fold(&values));
        }
        out
    })
}

// ---------------------------------------------------------------------------
// invert_rank
// ---------------------------------------------------------------------------

/// For rank-semantics weights (lower is better): `r ↦ 1 / (r + 1)`.
#[must_use]
#[instrument(skip(graph), fields(edges = graph.edge_count()))]
pub fn invert_rank(graph: &WeightedGraph) -> WeightedGraph {
    rewrite(graph, |r| 1.0 / (r.max(0.0) + 1.0))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn rewrite(graph: &WeightedGraph, f: impl Fn(f64) -> f64) -> WeightedGraph {
    graph.map_edges(|edge: &Edge| {
        let mut out = edge.clone();
        out.set_effective(f(edge.effective_weight()));
        out
    })
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

#[allow(clippy::cast_precision_loss)]
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
