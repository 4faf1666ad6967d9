//! Interchange document: a node table, an edge table, and a metadata block.
//!
//! Field names are stable (`id`, `type`, `partition`, `attributes`,
//! `source`, `target`, `weight`) so downstream exporters can map them onto
//! their own graph formats without knowing engine internals.

use serde::{Deserialize, Serialize};

use crate::error::BackboneError;
use crate::graph::build::{BuildReport, EdgeRecord, GraphBuilder};
use crate::graph::model::{Node, WeightedGraph};

/// Attribute name under which a staged working weight is exported.
pub const WORKING_WEIGHT_ATTRIBUTE: &str = "working_weight";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl GraphDocument {
    /// Snapshot a graph. Every node is listed, including isolates.
    #[must_use]
    pub fn from_graph(graph: &WeightedGraph) -> Self {
        let nodes = graph.nodes().cloned().collect();
        let edges = graph
            .edges()
            .map(|view| {
                let mut attributes = view.edge.attributes.clone();
                if let Some(working) = view.edge.working_weight() {
                    attributes.insert(WORKING_WEIGHT_ATTRIBUTE.to_string(), working.into());
                }
                EdgeRecord {
                    source: view.source.to_string(),
                    target: view.target.to_string(),
                    weight: Some(view.edge.weight),
                    attributes,
                }
            })
            .collect();
        Self {
            directed: graph.is_directed(),
            nodes,
            edges,
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Rebuild a graph through `builder`; the document's `directed` flag
    /// and node table override whatever the builder was given.
    ///
    /// # Errors
    ///
    /// Propagates [`BackboneError::MalformedInput`] from a strict builder.
    pub fn into_graph(self, builder: GraphBuilder) -> Result<(WeightedGraph, BuildReport), BackboneError> {
        builder
            .directed(self.directed)
            .nodes(self.nodes)
            .build_with_report(self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_field_names_are_stable() {
        let g = GraphBuilder::new()
            .node(Node::new("a").with_type("source").with_partition(0))
            .build([EdgeRecord::new("a", "b", 2.5)])
            .expect("build");
        let doc = GraphDocument::from_graph(&g);
        let json = serde_json::to_value(&doc).expect("serialize");

        assert_eq!(json["nodes"][0]["id"], "a");
        assert_eq!(json["nodes"][0]["type"], "source");
        assert_eq!(json["nodes"][0]["partition"], 0);
        assert_eq!(json["edges"][0]["source"], "a");
        assert_eq!(json["edges"][0]["target"], "b");
        assert_eq!(json["edges"][0]["weight"], 2.5);
    }

    #[test]
    fn document_round_trips_through_builder() {
        let g = GraphBuilder::new()
            .directed(true)
            .node(Node::new("lonely"))
            .build([("a", "b", 1.0), ("b", "c", 3.0)])
            .expect("build");
        let doc = GraphDocument::from_graph(&g);
        let (back, _) = doc.into_graph(GraphBuilder::new()).expect("rebuild");
        assert_eq!(back, g);
    }

    #[test]
    fn parses_minimal_json() {
        let doc: GraphDocument = serde_json::from_str(
            r#"{"edges":[{"source":"q1","target":"example.org","weight":3},{"source":"q1","target":"other.org"}]}"#,
        )
        .expect("parse");
        assert!(!doc.directed);
        assert_eq!(doc.edges[1].weight, None);
    }
}
