//! Structure-preservation checks comparing a backbone with its source graph.
//!
//! Only structural violations (the backbone is larger than its input, holds
//! edges the input did not have, or breaks a bipartite input) make a report
//! invalid. Weak preservation metrics add warnings and nothing else.

pub mod community;
pub mod connectivity;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::graph::model::{Edge, WeightedGraph};

pub use community::{CommunityFailure, community_similarity, normalized_mutual_information};
pub use connectivity::connectivity_preservation;

pub const METRIC_WEIGHT: &str = "weight_preservation";
pub const METRIC_CONNECTIVITY: &str = "connectivity_preservation";
pub const METRIC_COMMUNITY: &str = "community_similarity";

const WEIGHT_WARN_BELOW: f64 = 0.5;
const CONNECTIVITY_WARN_BELOW: f64 = 0.3;
const COMMUNITY_WARN_BELOW: f64 = 0.5;
/// Community score used when detection fails.
pub const NEUTRAL_COMMUNITY_SCORE: f64 = 0.5;

/// Which per-edge number the weight-preservation metric reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightKey {
    /// The effective weight filters saw.
    #[default]
    Effective,
    /// A named numeric attribute (`"weight"` is the primary weight).
    Attribute(String),
}

impl WeightKey {
    fn read(&self, edge: &Edge) -> Option<f64> {
        match self {
            Self::Effective => Some(edge.effective_weight()),
            Self::Attribute(key) => edge.numeric_attribute(key),
        }
        .filter(|w| w.is_finite())
    }
}

/// Validator settings. The seed makes connectivity sampling reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub weight_key: WeightKey,
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            weight_key: WeightKey::default(),
            sample_cap: default_sample_cap(),
            seed: default_seed(),
        }
    }
}

const fn default_sample_cap() -> usize {
    1_000
}

const fn default_seed() -> u64 {
    42
}

/// Outcome of [`Validator::validate`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
}

impl ValidationReport {
    fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    #[must_use]
    pub fn weight_preservation(&self) -> Option<f64> {
        self.metric(METRIC_WEIGHT)
    }

    #[must_use]
    pub fn connectivity_preservation(&self) -> Option<f64> {
        self.metric(METRIC_CONNECTIVITY)
    }

    #[must_use]
    pub fn community_similarity(&self) -> Option<f64> {
        self.metric(METRIC_COMMUNITY)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    #[must_use]
    pub const fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Compare `backbone` against `original`. Never fails: problems are
    /// reported in the returned value.
    #[must_use]
    #[instrument(skip_all, fields(original_edges = original.edge_count(), backbone_edges = backbone.edge_count()))]
    pub fn validate(&self, original: &WeightedGraph, backbone: &WeightedGraph) -> ValidationReport {
        let mut report = ValidationReport {
            errors: structural_errors(original, backbone),
            ..ValidationReport::default()
        };
        report.valid = report.errors.is_empty();
        for err in &report.errors {
            warn!(error = %err, "structural violation");
        }

        let weight = weight_preservation(original, backbone, &self.config.weight_key);
        report.metrics.insert(METRIC_WEIGHT.to_string(), weight);
        if weight < WEIGHT_WARN_BELOW {
            report.warnings.push(format!(
                "weight preservation {weight:.3} is below {WEIGHT_WARN_BELOW}: retained edges are not much heavier than dropped ones"
            ));
        }

        let connectivity = connectivity_preservation(original, backbone, self.config.sample_cap, self.config.seed);
        report.metrics.insert(METRIC_CONNECTIVITY.to_string(), connectivity);
        if connectivity < CONNECTIVITY_WARN_BELOW {
            report.warnings.push(format!(
                "connectivity preservation {connectivity:.3} is below {CONNECTIVITY_WARN_BELOW}: the backbone disconnects most sampled pairs"
            ));
        }

        let community = match community_similarity(original, backbone) {
            Ok(score) => score,
            Err(failure) => {
                warn!(%failure, "community detection failed; using neutral score");
                report
                    .warnings
                    .push(format!("community detection failed ({failure}); similarity set to {NEUTRAL_COMMUNITY_SCORE}"));
                NEUTRAL_COMMUNITY_SCORE
            }
        };
        report.metrics.insert(METRIC_COMMUNITY.to_string(), community);
        if community < COMMUNITY_WARN_BELOW {
            report.warnings.push(format!(
                "community similarity {community:.3} is below {COMMUNITY_WARN_BELOW}: community structure changed"
            ));
        }

        debug!(
            valid = report.valid,
            weight, connectivity, community,
            warnings = report.warnings.len(),
            "validation finished"
        );
        report
    }
}

fn structural_errors(original: &WeightedGraph, backbone: &WeightedGraph) -> Vec<String> {
    let mut errors = Vec::new();
    if backbone.edge_count() > original.edge_count() {
        errors.push(format!(
            "backbone has more edges ({}) than the original ({})",
            backbone.edge_count(),
            original.edge_count()
        ));
    }
    if backbone.node_count() > original.node_count() {
        errors.push(format!(
            "backbone has more nodes ({}) than the original ({})",
            backbone.node_count(),
            original.node_count()
        ));
    }

    let foreign: Vec<String> = backbone
        .edges()
        .filter(|v| original.find_edge(v.source, v.target).is_none())
        .map(|v| format!("{} -> {}", v.source, v.target))
        .collect();
    if !foreign.is_empty() {
        errors.push(format!(
            "backbone has {} edge(s) absent from the original, e.g. {}",
            foreign.len(),
            foreign[0]
        ));
    }

    if original.is_bipartite() {
        let intra = backbone.intra_partition_edges();
        if let Some((a, b)) = intra.first() {
            errors.push(format!(
                "original is bipartite but the backbone has {} intra-partition edge(s), e.g. {a} - {b}",
                intra.len()
            ));
        }
    }
    errors
}

/// `(mean_kept − mean_dropped) / (mean_kept + mean_dropped)` over original
/// edges split by presence in the backbone, clipped to `[0, 1]`. Returns 1.0
/// when either side is empty or the denominator vanishes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weight_preservation(original: &WeightedGraph, backbone: &WeightedGraph, key: &WeightKey) -> f64 {
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for v in original.edges() {
        let Some(w) = key.read(v.edge) else { continue };
        if backbone.find_edge(v.source, v.target).is_some() {
            kept.push(w);
        } else {
            dropped.push(w);
        }
    }
    if kept.is_empty() || dropped.is_empty() {
        return 1.0;
    }
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let (mk, md) = (mean(&kept), mean(&dropped));
    let denom = mk + md;
    if denom == 0.0 || !denom.is_finite() {
        return 1.0;
    }
    ((mk - md) / denom).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::{GraphBuilder, build_graph};
    use crate::graph::model::Node;

    fn original() -> WeightedGraph {
        build_graph([
            ("a", "b", 9.0),
            ("b", "c", 9.0),
            ("c", "a", 9.0),
            ("x", "y", 9.0),
            ("y", "z", 9.0),
            ("z", "x", 9.0),
            ("c", "x", 1.0),
        ])
        .expect("build")
    }

    #[test]
    fn identical_graph_is_valid_without_warnings() {
        let g = original();
        let report = Validator::default().validate(&g, &g);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert_eq!(report.weight_preservation(), Some(1.0));
        assert_eq!(report.connectivity_preservation(), Some(1.0));
        assert!((report.community_similarity().expect("metric") - 1.0).abs() < 1e-12);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn weight_preservation_prefers_heavy_backbones() {
        let g = original();
        let backbone = g.retain(|_, _| true, |idx, _| idx.index() != 6);
        // kept mean 9, dropped mean 1 → 8/10.
        let w = weight_preservation(&g, &backbone, &WeightKey::Effective);
        assert!((w - 0.8).abs() < 1e-12);
        // Inverted: keep only the light edge → negative, clipped to 0.
        let light = g.retain(|_, _| true, |idx, _| idx.index() == 6);
        assert!(weight_preservation(&g, &light, &WeightKey::Effective).abs() < f64::EPSILON);
    }

    #[test]
    fn expansion_is_a_structural_error() {
        let small = build_graph([("a", "b", 1.0)]).expect("build");
        let big = original();
        let report = Validator::default().validate(&small, &big);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("more edges")));
        assert!(report.errors.iter().any(|e| e.contains("absent from the original")));
    }

    #[test]
    fn bipartite_break_is_a_structural_error() {
        let nodes = [
            Node::new("s1").with_partition(0),
            Node::new("s2").with_partition(0),
            Node::new("n1").with_partition(1),
        ];
        let original = GraphBuilder::new()
            .nodes(nodes.clone())
            .build([("s1", "n1", 1.0), ("s2", "n1", 1.0)])
            .expect("build");
        // The edge s1–s2 is absent from the original and intra-partition.
        let broken = GraphBuilder::new()
            .nodes(nodes)
            .build([("s1", "s2", 1.0)])
            .expect("build");
        let report = Validator::default().validate(&original, &broken);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("intra-partition")));
    }

    #[test]
    fn community_failure_is_neutral_and_warned() {
        let g = original();
        let tiny = build_graph([("a", "b", 9.0)]).expect("build");
        let report = Validator::default().validate(&g, &tiny);
        assert!(report.valid);
        assert_eq!(report.community_similarity(), Some(NEUTRAL_COMMUNITY_SCORE));
        assert!(report.warnings.iter().any(|w| w.contains("community detection failed")));
    }

    #[test]
    fn attribute_weight_key_reads_attributes() {
        let g = GraphBuilder::new()
            .build([
                crate::graph::build::EdgeRecord::new("a", "b", 1.0).with_attribute("score", 10.0),
                crate::graph::build::EdgeRecord::new("b", "c", 1.0).with_attribute("score", 2.0),
            ])
            .expect("build");
        let backbone = g.retain(|_, _| true, |idx, _| idx.index() == 0);
        let w = weight_preservation(&g, &backbone, &WeightKey::Attribute("score".into()));
        assert!((w - 8.0 / 12.0).abs() < 1e-12);
    }
}
