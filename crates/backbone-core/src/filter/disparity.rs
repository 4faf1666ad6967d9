//! Disparity filter (Serrano, Boguñá & Vespignani 2009).
//!
//! # Test
//!
//! For a node *i* with degree *kᵢ* and incident weights summing to *Wᵢ*,
//! each incident edge with share `p = wᵢⱼ / Wᵢ` scores
//!
//! ```text
//! αᵢⱼ = (1 − p)^(kᵢ − 1)
//! ```
//!
//! which is the probability, under a uniform random split of *Wᵢ* across
//! *kᵢ* edges, of seeing a share at least this large. An edge is retained
//! when `αᵢⱼ < α` from **either** endpoint (OR semantics).
//!
//! # Per-node branches
//!
//! - `kᵢ ≤ 1`: no distribution to test against; the node votes to retain.
//! - `Wᵢ ≤ 0`: the node abstains (neither retains nor rejects).
//! - otherwise: the node votes with `αᵢⱼ`.
//!
//! An edge on which both endpoints abstain is not retained.
//!
//! # Directed graphs
//!
//! The source endpoint is tested over its out-edges and the target endpoint
//! over its in-edges.
//!
//! # Scores
//!
//! [`disparity_scores`] reports, per edge, the smallest voting αᵢⱼ (with
//! auto-retain counted as `0.0`). The filter at level α keeps exactly the
//! edges whose score is `< α`, so retention is monotone in α by
//! construction.

use petgraph::{graph::EdgeIndex, visit::EdgeRef};

use crate::filter::{BipartiteMode, LocalStats};
use crate::graph::model::{Side, WeightedGraph};

/// One endpoint's verdict on an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SideVote {
    /// Degree ≤ 1: keep unconditionally.
    AutoRetain,
    /// Zero incident strength: no opinion.
    Abstain,
    /// αᵢⱼ for this side.
    Score(f64),
}

/// Verdict of one endpoint with degree `degree` and strength `strength` on
/// an incident edge of weight `weight`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn side_vote(weight: f64, degree: usize, strength: f64) -> SideVote {
    if degree <= 1 {
        return SideVote::AutoRetain;
    }
    if strength <= 0.0 {
        return SideVote::Abstain;
    }
    let p = (weight / strength).clamp(0.0, 1.0);
    SideVote::Score((1.0 - p).powf((degree - 1) as f64))
}

/// Minimum voting αᵢⱼ per edge, indexed by [`EdgeIndex::index`].
///
/// `None` means every eligible endpoint abstained.
#[must_use]
pub fn disparity_scores(graph: &WeightedGraph, bipartite: BipartiteMode) -> Vec<Option<f64>> {
    let source_stats = LocalStats::compute(graph, Side::Source);
    let target_stats = LocalStats::compute(graph, Side::Target);
    let g = graph.petgraph();

    let mut scores = vec![None; g.edge_count()];
    for e in g.edge_references() {
        let w = e.weight().effective_weight();
        let sides = [
            (e.source(), &source_stats),
            (e.target(), &target_stats),
        ];
        let mut best: Option<f64> = None;
        for (node, stats) in sides {
            let i = node.index();
            let vote = side_vote(w, stats.degree[i], stats.strength[i]);
            let score = match vote {
                SideVote::AutoRetain => Some(0.0),
                SideVote::Abstain => None,
                SideVote::Score(s) if bipartite.votes(g[node].partition) => Some(s),
                SideVote::Score(_) => None,
            };
            best = match (best, score) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        scores[e.id().index()] = best;
    }
    scores
}

/// Keep-mask for the disparity filter at significance level `alpha`.
#[must_use]
pub fn disparity_filter(graph: &WeightedGraph, alpha: f64, bipartite: BipartiteMode) -> Vec<bool> {
    disparity_scores(graph, bipartite)
        .into_iter()
        .map(|score| score.is_some_and(|s| s < alpha))
        .collect()
}

/// Edges retained by `mask`, as canonical keys (handy in tests and logs).
#[must_use]
pub fn retained_keys(graph: &WeightedGraph, mask: &[bool]) -> Vec<(String, String)> {
    let mut keys: Vec<(String, String)> = graph
        .petgraph()
        .edge_indices()
        .filter(|idx: &EdgeIndex| mask.get(idx.index()).copied().unwrap_or(false))
        .filter_map(|idx| graph.edge_key(idx))
        .collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::{GraphBuilder, build_graph};
    use crate::graph::model::Node;

    fn key(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    fn four_node() -> WeightedGraph {
        build_graph([("A", "B", 10.0), ("A", "C", 1.0), ("A", "D", 1.0), ("B", "C", 5.0)]).expect("build")
    }

    #[test]
    fn side_vote_branches() {
        assert_eq!(side_vote(3.0, 0, 0.0), SideVote::AutoRetain);
        assert_eq!(side_vote(3.0, 1, 3.0), SideVote::AutoRetain);
        assert_eq!(side_vote(0.0, 3, 0.0), SideVote::Abstain);
        match side_vote(1.0, 3, 4.0) {
            SideVote::Score(s) => assert!((s - 0.5625).abs() < 1e-12),
            other => panic!("expected score, got {other:?}"),
        }
    }

    #[test]
    fn hand_computed_four_node_graph() {
        // A: k=3, W=12 → A–B: (1-10/12)^2 = 0.0278; A–C, A–D: (11/12)^2 = 0.840
        // B: k=2, W=15 → B–A: 1/3; B–C: 2/3
        // C: k=2, W=6  → C–A: 5/6; C–B: 1/6
        // D: k=1 → A–D auto-retained
        let g = four_node();
        let scores = disparity_scores(&g, BipartiteMode::Symmetric);
        let by_key = |a: &str, b: &str| {
            let idx = g
                .petgraph()
                .edge_indices()
                .find(|&i| g.edge_key(i) == Some(key(a, b)))
                .expect("edge");
            scores[idx.index()].expect("scored")
        };
        assert!((by_key("A", "B") - 1.0 / 36.0).abs() < 1e-12);
        assert!((by_key("A", "C") - 5.0 / 6.0).abs() < 1e-12);
        assert!(by_key("A", "D").abs() < f64::EPSILON);
        assert!((by_key("B", "C") - 1.0 / 6.0).abs() < 1e-12);

        let mask = disparity_filter(&g, 0.05, BipartiteMode::Symmetric);
        assert_eq!(retained_keys(&g, &mask), vec![key("A", "B"), key("A", "D")]);
    }

    #[test]
    fn zero_strength_nodes_abstain() {
        // Path a-b-c with zero weights: b abstains, a and c are leaves.
        let g = build_graph([("a", "b", 0.0), ("b", "c", 0.0)]).expect("build");
        let mask = disparity_filter(&g, 0.01, BipartiteMode::Symmetric);
        assert_eq!(mask, vec![true, true]);

        // Triangle of zeros: every endpoint abstains, nothing survives.
        let t = build_graph([("a", "b", 0.0), ("b", "c", 0.0), ("c", "a", 0.0)]).expect("build");
        let scores = disparity_scores(&t, BipartiteMode::Symmetric);
        assert!(scores.iter().all(Option::is_none));
        assert_eq!(disparity_filter(&t, 1.0, BipartiteMode::Symmetric), vec![false; 3]);
    }

    #[test]
    fn directed_uses_out_and_in_strength() {
        // s → {a: 9, b: 1}; a is reached only from s (in-degree 1).
        let g = GraphBuilder::new()
            .directed(true)
            .build([("s", "a", 9.0), ("s", "b", 1.0), ("x", "b", 1.0), ("y", "b", 1.0)])
            .expect("build");
        let mask = disparity_filter(&g, 0.2, BipartiteMode::Symmetric);
        // s→a: out-side (1-0.9)^1 = 0.1 < 0.2; target side in-degree 1 → retain anyway.
        // s→b: out-side 0.9; b in-side k=3, p=1/3 → (2/3)^2 = 0.444 → dropped.
        // x→b, y→b: source out-degree 1 → retained.
        assert_eq!(mask, vec![true, false, true, true]);
    }

    #[test]
    fn partition_mode_only_counts_chosen_side() {
        // Sites (partition 0) and nouns (partition 1).
        let g = GraphBuilder::new()
            .nodes([
                Node::new("s1").with_partition(0),
                Node::new("s2").with_partition(0),
                Node::new("n1").with_partition(1),
                Node::new("n2").with_partition(1),
            ])
            .build([("s1", "n1", 9.0), ("s1", "n2", 1.0), ("s2", "n1", 1.0), ("s2", "n2", 9.0)])
            .expect("build");

        // From the site side: s1–n1 share 0.9 → 0.1; s1–n2 share 0.1 → 0.9.
        let site_side = disparity_filter(&g, 0.2, BipartiteMode::FromPartition(0));
        assert_eq!(site_side, vec![true, false, false, true]);

        // Symmetric mode: nouns also vote, but their splits are identical here.
        let both = disparity_filter(&g, 0.2, BipartiteMode::Symmetric);
        assert_eq!(both, vec![true, false, false, true]);

        // Voting only from nouns flips nothing for this symmetric layout.
        let noun_side = disparity_filter(&g, 0.2, BipartiteMode::FromPartition(1));
        assert_eq!(noun_side, vec![true, false, false, true]);
    }
}
