#![no_main]

use backbone_core::{GraphBuilder, GraphDocument};
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes must either fail to parse or build a graph whose edge
// count never exceeds the row count, in both lenient and strict mode.
fuzz_target!(|data: &[u8]| {
    let Ok(document) = serde_json::from_slice::<GraphDocument>(data) else {
        return;
    };
    let rows = document.edges.len();

    if let Ok((graph, report)) = document.clone().into_graph(GraphBuilder::new()) {
        assert!(graph.edge_count() <= rows);
        assert_eq!(report.rows, rows);
        assert_eq!(report.edges, graph.edge_count());
        let _ = graph.content_hash();
    }
    let _ = document.into_graph(GraphBuilder::new().strict(true));
});
