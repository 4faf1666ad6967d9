//! Community-structure agreement: Louvain local moving on both graphs over
//! their shared nodes, compared with normalized mutual information.
//!
//! Node order is the sorted id order and ties keep the current community, so
//! the partition is deterministic for a given graph.

use std::collections::BTreeMap;

use petgraph::{graph::NodeIndex, visit::EdgeRef};

use crate::graph::model::WeightedGraph;

/// Smallest shared node set community detection is attempted on.
pub const MIN_COMMON_NODES: usize = 3;

const MAX_PASSES: usize = 100;

/// Why detection could not produce a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunityFailure {
    TooFewNodes(usize),
    NoEdges,
}

impl std::fmt::Display for CommunityFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewNodes(n) => write!(f, "only {n} shared nodes (need {MIN_COMMON_NODES})"),
            Self::NoEdges => write!(f, "no edges among shared nodes"),
        }
    }
}

/// NMI between the community partitions of `original` and `backbone`
/// restricted to the nodes they share.
///
/// # Errors
///
/// Returns a [`CommunityFailure`] when either restricted graph is too small
/// or has no edges to cluster.
pub fn community_similarity(original: &WeightedGraph, backbone: &WeightedGraph) -> Result<f64, CommunityFailure> {
    let mut common: Vec<&str> = backbone
        .nodes()
        .map(|n| n.id.as_str())
        .filter(|id| original.node_index(id).is_some())
        .collect();
    common.sort_unstable();
    if common.len() < MIN_COMMON_NODES {
        return Err(CommunityFailure::TooFewNodes(common.len()));
    }

    let before = louvain(&adjacency(original, &common)).ok_or(CommunityFailure::NoEdges)?;
    let after = louvain(&adjacency(backbone, &common)).ok_or(CommunityFailure::NoEdges)?;
    Ok(normalized_mutual_information(&before, &after))
}

/// Undirected weighted adjacency over `ids` (sorted). Negative weights are
/// clamped to zero; a graph whose weights are all zero is treated as unit
/// weighted so its topology still clusters.
fn adjacency(graph: &WeightedGraph, ids: &[&str]) -> Vec<Vec<(usize, f64)>> {
    let g = graph.petgraph();
    let position = |idx: NodeIndex| ids.binary_search(&g[idx].id.as_str()).ok();

    let mut pairs = Vec::new();
    for e in g.edge_references() {
        if let (Some(a), Some(b)) = (position(e.source()), position(e.target()))
            && a != b
        {
            pairs.push((a, b, e.weight().effective_weight().max(0.0)));
        }
    }
    let unit = pairs.iter().all(|&(_, _, w)| w == 0.0);

    let mut adj = vec![Vec::new(); ids.len()];
    for (a, b, w) in pairs {
        let w = if unit { 1.0 } else { w };
        adj[a].push((b, w));
        adj[b].push((a, w));
    }
    adj
}

/// Louvain local-moving phase. `None` when there is no edge weight.
#[allow(clippy::cast_precision_loss)]
fn louvain(adj: &[Vec<(usize, f64)>]) -> Option<Vec<usize>> {
    let degrees: Vec<f64> = adj.iter().map(|n| n.iter().map(|(_, w)| w).sum()).collect();
    let m: f64 = degrees.iter().sum::<f64>() / 2.0;
    if m <= 0.0 {
        return None;
    }

    let mut community: Vec<usize> = (0..adj.len()).collect();
    let mut totals: Vec<f64> = degrees.clone();

    for _ in 0..MAX_PASSES {
        let mut moved = false;
        for node in 0..adj.len() {
            let current = community[node];
            let k = degrees[node];
            totals[current] -= k;

            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for &(nb, w) in &adj[node] {
                *links.entry(community[nb]).or_insert(0.0) += w;
            }

            let gain = |c: usize, k_in: f64| k_in / m - totals[c] * k / (2.0 * m * m);
            let mut best = current;
            let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
            for (&c, &k_in) in &links {
                let g = gain(c, k_in);
                if g > best_gain + 1e-12 {
                    best = c;
                    best_gain = g;
                }
            }

            totals[best] += k;
            if best != current {
                community[node] = best;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
    Some(community)
}

/// Arithmetic-mean NMI, `2·I(X;Y) / (H(X) + H(Y))`. Two single-cluster
/// partitions count as identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalized_mutual_information(a: &[usize], b: &[usize]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 1.0;
    }
    let total = n as f64;

    let mut joint: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    let mut left: BTreeMap<usize, usize> = BTreeMap::new();
    let mut right: BTreeMap<usize, usize> = BTreeMap::new();
    for (&x, &y) in a.iter().zip(b) {
        *joint.entry((x, y)).or_insert(0) += 1;
        *left.entry(x).or_insert(0) += 1;
        *right.entry(y).or_insert(0) += 1;
    }

    let entropy = |counts: &BTreeMap<usize, usize>| -> f64 {
        counts
            .values()
            .map(|&c| {
                let p = c as f64 / total;
                -p * p.ln()
            })
            .sum()
    };
    let h_a = entropy(&left);
    let h_b = entropy(&right);
    if h_a + h_b <= f64::EPSILON {
        return 1.0;
    }

    let mutual: f64 = joint
        .iter()
        .map(|(&(x, y), &c)| {
            let p_xy = c as f64 / total;
            let p_x = left[&x] as f64 / total;
            let p_y = right[&y] as f64 / total;
            p_xy * (p_xy / (p_x * p_y)).ln()
        })
        .sum();

    (2.0 * mutual / (h_a + h_b)).clamp(0.0, 1.0)
}
