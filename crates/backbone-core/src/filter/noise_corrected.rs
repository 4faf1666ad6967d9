//! Noise-corrected backbone (Coscia & Neffke 2017).
//!
//! Each edge weight `nᵢⱼ` is compared to its expectation under a null model
//! where node *i* and node *j* connect in proportion to their strengths
//! `nᵢ.` and `n.ⱼ` out of a total `n..`. The lift is mapped onto `(-1, 1)`:
//!
//! ```text
//! κ     = n.. / (nᵢ. · n.ⱼ)
//! score = (κ·nᵢⱼ − 1) / (κ·nᵢⱼ + 1)
//! ```
//!
//! A Beta prior on the connection probability, updated with the observed
//! weight, gives a posterior variance for `nᵢⱼ`; the delta method carries it
//! onto the score. The edge is kept when
//!
//! ```text
//! score − δ · sd(score) > 0,    δ = Φ⁻¹(1 − α)
//! ```
//!
//! so smaller α means a larger δ and fewer edges.
//!
//! # Strengths
//!
//! Undirected graphs use each endpoint's total strength and `n..` = the sum
//! of all strengths (twice the total weight). Directed graphs use the
//! source's out-strength, the target's in-strength, and `n..` = total weight.
//!
//! Edges with non-positive weight, or touching a node of non-positive
//! strength, are not retained. When the posterior variance is not a
//! positive finite number the test reduces to `score > 0`.
//!
//! # Cost
//!
//! Strength tables are `O(E)`; the per-edge test is constant time. The
//! heavier part relative to the disparity filter is the floating-point work
//! per edge, not asymptotics.

use petgraph::visit::EdgeRef;

use crate::filter::LocalStats;
use crate::graph::model::{Side, WeightedGraph};

/// Keep-mask for the noise-corrected filter at significance level `alpha`.
#[must_use]
pub fn noise_corrected_filter(graph: &WeightedGraph, alpha: f64) -> Vec<bool> {
    let delta = normal_quantile(1.0 - alpha);
    noise_corrected_scores(graph)
        .into_iter()
        .map(|s| s.is_some_and(|s| s.score - delta * s.sdev > 0.0))
        .collect()
}

/// Lift score and its standard deviation for one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseScore {
    pub score: f64,
    pub sdev: f64,
}

/// Per-edge [`NoiseScore`], indexed by edge index. `None` for edges the
/// null model cannot evaluate (non-positive weight or strength).
#[must_use]
pub fn noise_corrected_scores(graph: &WeightedGraph) -> Vec<Option<NoiseScore>> {
    let out_stats = LocalStats::compute(graph, Side::Source);
    let in_stats = LocalStats::compute(graph, Side::Target);
    let total: f64 = if graph.is_directed() {
        graph.total_weight()
    } else {
        2.0 * graph.total_weight()
    };

    let g = graph.petgraph();
    let mut scores = vec![None; g.edge_count()];
    for e in g.edge_references() {
        let nij = e.weight().effective_weight();
        let ni = out_stats.strength[e.source().index()];
        let nj = in_stats.strength[e.target().index()];
        scores[e.id().index()] = edge_score(nij, ni, nj, total);
    }
    scores
}

fn edge_score(nij: f64, ni: f64, nj: f64, n: f64) -> Option<NoiseScore> {
    if nij <= 0.0 || ni <= 0.0 || nj <= 0.0 || n <= 1.0 {
        return None;
    }

    let kappa = n / (ni * nj);
    let lift = kappa * nij;
    let score = (lift - 1.0) / (lift + 1.0);

    let mean_prior = (ni * nj) / (n * n);
    let var_prior = (ni * nj * (n - ni) * (n - nj)) / (n.powi(4) * (n - 1.0));

    let sdev = if var_prior > 0.0 && var_prior.is_finite() {
        let alpha_prior = (mean_prior.powi(2) / var_prior) * (1.0 - mean_prior) - mean_prior;
        let beta_prior = (mean_prior / var_prior) * (1.0 - mean_prior.powi(2)) - (1.0 - mean_prior);
        let alpha_post = alpha_prior + nij;
        let beta_post = n - nij + beta_prior;
        let expected = alpha_post / (alpha_post + beta_post);
        let variance_nij = expected * (1.0 - expected) * n;

        let d = 1.0 / (ni * nj) - n * ((ni + nj) / (ni * nj).powi(2));
        let slope = (2.0 * (kappa + nij * d)) / (lift + 1.0).powi(2);
        let variance = variance_nij * slope.powi(2);
        if variance.is_finite() && variance > 0.0 {
            variance.sqrt()
        } else {
            0.0
        }
    } else {
        0.0
    };

    Some(NoiseScore { score, sdev })
}

/// Inverse standard-normal CDF (Acklam's rational approximation, relative
/// error below 1.2e-9). `p` is clamped into the open unit interval.
#[must_use]
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    let p = p.clamp(1e-12, 1.0 - 1e-12);

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
