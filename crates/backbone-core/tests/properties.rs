use backbone_core::filter::{BipartiteMode, disparity_filter};
use backbone_core::weight::{NormalizeMethod, normalize};
use backbone_core::{Algorithm, BackboningConfig, ThresholdSpec, run_backboning};
use proptest::prelude::*;

use generators::arb_graph;

fn kept(mask: &[bool]) -> usize {
    mask.iter().filter(|&&k| k).count()
}

fn arb_algorithm() -> impl Strategy<Value = Algorithm> {
    prop_oneof![
        (0.001f64..=1.0).prop_map(|alpha| Algorithm::DisparityFilter { alpha }),
        (0.001f64..=1.0).prop_map(|alpha| Algorithm::NoiseCorrected { alpha }),
        (0.0f64..500.0).prop_map(|t| Algorithm::Threshold {
            threshold: ThresholdSpec::Value(t)
        }),
        Just(Algorithm::Threshold {
            threshold: ThresholdSpec::default()
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn backbone_never_expands(
        g in arb_graph(12, 30),
        algorithm in arb_algorithm(),
        min_degree in prop::option::of(0usize..4),
        retain in any::<bool>(),
    ) {
        let mut config = BackboningConfig::new(algorithm).retain_disconnected(retain);
        config.min_degree = min_degree;
        let result = run_backboning(&g, &config);
        if cfg!(not(feature = "noise-corrected")) && matches!(algorithm, Algorithm::NoiseCorrected { .. }) {
            prop_assert!(result.is_err());
        } else {
            let (backbone, stats) = result.expect("backbone");
            prop_assert!(backbone.edge_count() <= g.edge_count());
            prop_assert!(backbone.node_count() <= g.node_count());
            prop_assert_eq!(stats.backbone_edges, backbone.edge_count());
            prop_assert!((0.0..=100.0).contains(&stats.reduction_pct));
        }
    }

    #[test]
    fn leaf_edges_always_survive_disparity(g in arb_graph(10, 20), alpha in 0.0001f64..=1.0) {
        let mask = disparity_filter(&g, alpha, BipartiteMode::Symmetric);
        let pg = g.petgraph();
        for idx in pg.edge_indices() {
            let (a, b) = pg.edge_endpoints(idx).expect("endpoints");
            if g.degree(a) <= 1 || g.degree(b) <= 1 {
                prop_assert!(mask[idx.index()], "leaf edge {:?} dropped at α={}", g.edge_key(idx), alpha);
            }
        }
    }

    #[test]
    fn stricter_alpha_never_keeps_more(g in arb_graph(10, 25), a in 0.0001f64..=1.0, b in 0.0001f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let strict = disparity_filter(&g, lo, BipartiteMode::Symmetric);
        let loose = disparity_filter(&g, hi, BipartiteMode::Symmetric);
        prop_assert!(kept(&strict) <= kept(&loose));
        // Nested, not just smaller.
        for (s, l) in strict.iter().zip(&loose) {
            prop_assert!(!s || *l);
        }
    }

    #[test]
    fn min_max_normalization_is_idempotent(g in arb_graph(10, 20)) {
        let once = normalize(&g, NormalizeMethod::MinMax);
        let twice = normalize(&once, NormalizeMethod::MinMax);
        for (x, y) in once.edges().zip(twice.edges()) {
            prop_assert!((x.edge.weight - y.edge.weight).abs() < 1e-9);
        }
    }
}
