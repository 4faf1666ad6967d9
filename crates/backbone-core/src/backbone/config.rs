//! Job configuration for the backboner.
//!
//! [`BackboningConfig`] is a plain serde value. Missing fields take their
//! defaults, so a TOML table with only `[algorithm]` set is a complete
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::BackboneError;
use crate::filter::{AutoThreshold, BipartiteMode, ThresholdSpec};

/// Default significance level for the statistical filters.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Edge count above which component chunking is considered.
pub const DEFAULT_CHUNK_EDGE_THRESHOLD: usize = 100_000;

/// The significance filter to run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Algorithm {
    DisparityFilter {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    NoiseCorrected {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    Threshold {
        #[serde(default)]
        threshold: ThresholdSpec,
    },
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::DisparityFilter {
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl Algorithm {
    /// Parse an algorithm name coming from a CLI flag or job payload.
    ///
    /// `alpha` is ignored by `threshold`; `threshold` is ignored by the
    /// statistical filters. A missing threshold means the median fallback.
    ///
    /// # Errors
    ///
    /// Returns [`BackboneError::UnsupportedAlgorithm`] for unknown names.
    pub fn from_name(name: &str, alpha: Option<f64>, threshold: Option<f64>) -> Result<Self, BackboneError> {
        let alpha = alpha.unwrap_or(DEFAULT_ALPHA);
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "disparity_filter" | "disparity" => Ok(Self::DisparityFilter { alpha }),
            "noise_corrected" | "nc" => Ok(Self::NoiseCorrected { alpha }),
            "threshold" => Ok(Self::Threshold {
                threshold: threshold.map_or(ThresholdSpec::Auto(AutoThreshold::Median), ThresholdSpec::Value),
            }),
            other => Err(BackboneError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DisparityFilter { .. } => "disparity_filter",
            Self::NoiseCorrected { .. } => "noise_corrected",
            Self::Threshold { .. } => "threshold",
        }
    }

    /// Significance level, for the statistical filters.
    #[must_use]
    pub const fn alpha(&self) -> Option<f64> {
        match self {
            Self::DisparityFilter { alpha } | Self::NoiseCorrected { alpha } => Some(*alpha),
            Self::Threshold { .. } => None,
        }
    }

    /// The same algorithm with its search parameter replaced: α for the
    /// statistical filters, an explicit threshold for `threshold`.
    #[must_use]
    pub const fn with_parameter(self, value: f64) -> Self {
        match self {
            Self::DisparityFilter { .. } => Self::DisparityFilter { alpha: value },
            Self::NoiseCorrected { .. } => Self::NoiseCorrected { alpha: value },
            Self::Threshold { .. } => Self::Threshold {
                threshold: ThresholdSpec::Value(value),
            },
        }
    }

    /// Whether an edge's verdict depends only on its own connected
    /// component. Such filters can be evaluated per component.
    #[must_use]
    pub const fn is_component_local(&self) -> bool {
        matches!(
            self,
            Self::DisparityFilter { .. }
                | Self::Threshold {
                    threshold: ThresholdSpec::Value(_)
                }
        )
    }

    fn validate(&self) -> Result<(), BackboneError> {
        match *self {
            Self::DisparityFilter { alpha } | Self::NoiseCorrected { alpha } => {
                if !(alpha.is_finite() && alpha > 0.0 && alpha <= 1.0) {
                    return Err(BackboneError::InvalidConfig(format!(
                        "alpha must be in (0, 1], got {alpha}"
                    )));
                }
            }
            Self::Threshold {
                threshold: ThresholdSpec::Value(t),
            } if !t.is_finite() => {
                return Err(BackboneError::InvalidConfig(format!(
                    "threshold must be finite, got {t}"
                )));
            }
            Self::Threshold { .. } => {}
        }
        Ok(())
    }
}

/// Target edge-reduction ratio for the adaptive search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetReduction {
    /// Fraction of edges to remove, in `[0, 1)`.
    pub ratio: f64,
    /// Accepted relative deviation from the target edge count.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl TargetReduction {
    #[must_use]
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio,
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// # Errors
    ///
    /// Returns [`BackboneError::InvalidConfig`] when the ratio is outside
    /// `[0, 1)`, the tolerance is not positive, or no iterations are allowed.
    pub fn validate(&self) -> Result<(), BackboneError> {
        if !(self.ratio.is_finite() && (0.0..1.0).contains(&self.ratio)) {
            return Err(BackboneError::InvalidConfig(format!(
                "target reduction must be in [0, 1), got {}",
                self.ratio
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(BackboneError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(BackboneError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// When and how to split large graphs into components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: usize,
    /// Worker cap for the per-component pool; `None` uses the rayon default.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            edge_threshold: default_edge_threshold(),
            max_workers: None,
        }
    }
}

/// Everything a backboning job needs besides the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackboningConfig {
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Absolute floor on effective weight, applied after any algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_weight: Option<f64>,
    /// Post-filter degree floor, applied once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_degree: Option<usize>,
    /// Keep nodes left with no edges.
    #[serde(default)]
    pub retain_disconnected: bool,
    #[serde(default)]
    pub bipartite: BipartiteMode,
    /// Drives [`crate::backbone::search_for_target`] when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetReduction>,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

impl Default for BackboningConfig {
    fn default() -> Self {
        Self::new(Algorithm::default())
    }
}

impl BackboningConfig {
    #[must_use]
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            min_weight: None,
            min_degree: None,
            retain_disconnected: false,
            bipartite: BipartiteMode::default(),
            target: None,
            chunking: ChunkingConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_min_weight(mut self, min_weight: f64) -> Self {
        self.min_weight = Some(min_weight);
        self
    }

    #[must_use]
    pub const fn with_min_degree(mut self, min_degree: usize) -> Self {
        self.min_degree = Some(min_degree);
        self
    }

    #[must_use]
    pub const fn retain_disconnected(mut self, retain: bool) -> Self {
        self.retain_disconnected = retain;
        self
    }

    #[must_use]
    pub const fn with_bipartite(mut self, mode: BipartiteMode) -> Self {
        self.bipartite = mode;
        self
    }

    #[must_use]
    pub const fn with_target(mut self, target: TargetReduction) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub const fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Check every field against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`BackboneError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), BackboneError> {
        self.algorithm.validate()?;
        if let Some(w) = self.min_weight
            && !w.is_finite()
        {
            return Err(BackboneError::InvalidConfig(format!(
                "min_weight must be finite, got {w}"
            )));
        }
        if let Some(target) = &self.target {
            target.validate()?;
        }
        if self.chunking.max_workers == Some(0) {
            return Err(BackboneError::InvalidConfig(
                "chunking.max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

const fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

const fn default_tolerance() -> f64 {
    0.05
}

const fn default_max_iterations() -> u32 {
    20
}

const fn default_edge_threshold() -> usize {
    DEFAULT_CHUNK_EDGE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_accepts_aliases() {
        assert_eq!(
            Algorithm::from_name("Disparity-Filter", Some(0.1), None).expect("parse"),
            Algorithm::DisparityFilter { alpha: 0.1 }
        );
        assert_eq!(
            Algorithm::from_name("threshold", None, None).expect("parse"),
            Algorithm::Threshold {
                threshold: ThresholdSpec::Auto(AutoThreshold::Median)
            }
        );
        assert_eq!(
            Algorithm::from_name("threshold", None, Some(2.5)).expect("parse"),
            Algorithm::Threshold {
                threshold: ThresholdSpec::Value(2.5)
            }
        );
        let err = Algorithm::from_name("pagerank", None, None).expect_err("unknown");
        assert_eq!(err.code(), "E1002");
    }

    #[test]
    fn validate_rejects_out_of_domain_values() {
        let bad_alpha = BackboningConfig::new(Algorithm::DisparityFilter { alpha: 0.0 });
        assert!(matches!(bad_alpha.validate(), Err(BackboneError::InvalidConfig(_))));

        let alpha_one = BackboningConfig::new(Algorithm::DisparityFilter { alpha: 1.0 });
        assert!(alpha_one.validate().is_ok());

        let bad_target = BackboningConfig::default().with_target(TargetReduction::new(1.0));
        assert!(bad_target.validate().is_err());

        let bad_tol = BackboningConfig::default().with_target(TargetReduction::new(0.5).with_tolerance(0.0));
        assert!(bad_tol.validate().is_err());

        let no_iters = BackboningConfig::default().with_target(TargetReduction::new(0.5).with_max_iterations(0));
        assert!(no_iters.validate().is_err());

        let negative_threshold = BackboningConfig::new(Algorithm::Threshold {
            threshold: ThresholdSpec::Value(-1.0),
        });
        assert!(negative_threshold.validate().is_ok());
    }

    #[test]
    fn component_locality() {
        assert!(Algorithm::default().is_component_local());
        assert!(!Algorithm::NoiseCorrected { alpha: 0.1 }.is_component_local());
        assert!(
            Algorithm::Threshold {
                threshold: ThresholdSpec::Value(1.0)
            }
            .is_component_local()
        );
        assert!(
            !Algorithm::Threshold {
                threshold: ThresholdSpec::default()
            }
            .is_component_local()
        );
    }

    #[test]
    fn json_round_trip_fills_defaults() {
        let cfg: BackboningConfig =
            serde_json::from_str(r#"{"algorithm": {"name": "noise_corrected"}, "min_degree": 2}"#).expect("parse");
        assert_eq!(cfg.algorithm, Algorithm::NoiseCorrected { alpha: DEFAULT_ALPHA });
        assert_eq!(cfg.min_degree, Some(2));
        assert_eq!(cfg.chunking.edge_threshold, DEFAULT_CHUNK_EDGE_THRESHOLD);
        assert!(!cfg.retain_disconnected);

        let threshold: Algorithm =
            serde_json::from_str(r#"{"name": "threshold", "threshold": {"auto": "upper_quartile"}}"#).expect("parse");
        assert_eq!(
            threshold,
            Algorithm::Threshold {
                threshold: ThresholdSpec::Auto(AutoThreshold::UpperQuartile)
            }
        );
    }
}
