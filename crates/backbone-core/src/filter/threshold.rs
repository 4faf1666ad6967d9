//! Absolute weight threshold: keep edges with effective weight `≥ t`.
//!
//! When no threshold is supplied the filter derives one from the edge-weight
//! distribution (median by default, 75th percentile as the explicit
//! alternative). The derived value and the rule that produced it are always
//! returned so the caller can report them.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::graph::model::WeightedGraph;

/// Which distribution statistic replaces a missing threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoThreshold {
    #[default]
    Median,
    UpperQuartile,
}

impl AutoThreshold {
    #[must_use]
    pub const fn quantile(self) -> f64 {
        match self {
            Self::Median => 0.5,
            Self::UpperQuartile => 0.75,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::UpperQuartile => "75th percentile",
        }
    }
}

/// A threshold given explicitly or derived from the weight distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSpec {
    Value(f64),
    Auto(AutoThreshold),
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        Self::Auto(AutoThreshold::Median)
    }
}

/// Result of the threshold filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdOutcome {
    pub keep: Vec<bool>,
    /// The threshold actually applied.
    pub threshold: f64,
    /// Set when the threshold was derived rather than supplied.
    pub derived_from: Option<AutoThreshold>,
}

/// Keep-mask for the threshold filter.
#[must_use]
pub fn threshold_filter(graph: &WeightedGraph, spec: ThresholdSpec) -> ThresholdOutcome {
    let weights: Vec<f64> = graph.edges().map(|v| v.edge.effective_weight()).collect();

    let (threshold, derived_from) = match spec {
        ThresholdSpec::Value(t) => (t, None),
        ThresholdSpec::Auto(rule) => {
            let t = quantile(&weights, rule.quantile()).unwrap_or(0.0);
            warn!(
                rule = rule.as_str(),
                threshold = t,
                "no threshold supplied; derived from edge-weight distribution"
            );
            (t, Some(rule))
        }
    };

    let keep = weights.iter().map(|&w| w >= threshold).collect();
    ThresholdOutcome {
        keep,
        threshold,
        derived_from,
    }
}

/// Linear-interpolation quantile (`q ∈ [0, 1]`) of unsorted `values`.
///
/// Returns `None` for an empty slice.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
