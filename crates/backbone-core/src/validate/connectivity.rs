//! Sampled path-existence agreement between two graphs.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::graph::components::component_labels;
use crate::graph::model::WeightedGraph;

/// Fraction of node pairs connected in `original` that are still connected
/// in `backbone`, over at most `cap` pairs drawn with `seed`.
///
/// All pairs are checked when there are no more than `cap` of them.
/// Returns 1.0 for graphs with fewer than two nodes and when no sampled pair
/// was connected to begin with.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn connectivity_preservation(original: &WeightedGraph, backbone: &WeightedGraph, cap: usize, seed: u64) -> f64 {
    let n = original.node_count();
    if n < 2 || cap == 0 {
        return 1.0;
    }

    let before = component_labels(original);
    let after = component_labels(backbone);
    // Backbone label per original node, `None` when the node was dropped.
    let relabel: Vec<Option<usize>> = original
        .nodes()
        .map(|node| backbone.node_index(&node.id).map(|idx| after[idx.index()]))
        .collect();

    let mut connected = 0usize;
    let mut kept = 0usize;
    let mut check = |i: usize, j: usize| {
        if before[i] != before[j] {
            return;
        }
        connected += 1;
        if let (Some(a), Some(b)) = (relabel[i], relabel[j])
            && a == b
        {
            kept += 1;
        }
    };

    let total_pairs = n.saturating_mul(n - 1) / 2;
    if total_pairs <= cap {
        for i in 0..n {
            for j in (i + 1)..n {
                check(i, j);
            }
        }
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..cap {
            let i = rng.gen_range(0..n);
            let mut j = rng.gen_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            check(i, j);
        }
    }

    if connected == 0 {
        1.0
    } else {
        kept as f64 / connected as f64
    }
}
