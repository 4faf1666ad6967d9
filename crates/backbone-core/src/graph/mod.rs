//! Weighted graph model and construction.
//!
//! # Pipeline
//!
//! ```text
//! (source, target, weight, attributes) rows
//!        ↓  build::GraphBuilder::build()
//! WeightedGraph (petgraph DiGraph + id index, directed flag)
//!        ↓  crate::weight::{invert_rank, combine, normalize}
//! WeightedGraph with canonical effective weights
//!        ↓  crate::backbone::Backboner::apply()
//! backbone WeightedGraph + BackboningStatistics
//! ```
//!
//! [`document::GraphDocument`] is the serde form of a graph used at the
//! process boundary.

pub mod build;
pub mod components;
pub mod document;
pub mod model;

pub use build::{BuildReport, DuplicatePolicy, EdgeRecord, GraphBuilder, build_graph};
pub use components::{ComponentSlice, component_count, component_labels, split_components};
pub use document::GraphDocument;
pub use model::{Attributes, Edge, EdgeView, Node, Side, WeightedGraph};
