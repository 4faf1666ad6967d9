#![no_main]

use backbone_core::{Algorithm, BackboningConfig, GraphBuilder, GraphDocument, ThresholdSpec, run_backboning, validate};
use libfuzzer_sys::fuzz_target;

// Every algorithm on a buildable document yields a backbone that is no
// larger than its input and passes structural validation.
fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(document) = serde_json::from_slice::<GraphDocument>(rest) else {
        return;
    };
    let Ok((graph, _)) = document.into_graph(GraphBuilder::new()) else {
        return;
    };

    let alpha = f64::from(selector % 100 + 1) / 100.0;
    let algorithm = match selector % 3 {
        0 => Algorithm::DisparityFilter { alpha },
        1 => Algorithm::NoiseCorrected { alpha },
        _ => Algorithm::Threshold {
            threshold: ThresholdSpec::default(),
        },
    };
    let Ok((backbone, stats)) = run_backboning(&graph, &BackboningConfig::new(algorithm)) else {
        return;
    };
    assert!(backbone.edge_count() <= graph.edge_count());
    assert_eq!(stats.backbone_edges, backbone.edge_count());
    assert!(validate(&graph, &backbone).valid);
});
