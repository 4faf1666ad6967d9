//! Backbone extraction: configuration, the backboner, and the adaptive
//! target-reduction search that drives it.

pub mod adaptive;
pub mod apply;
pub mod config;
pub mod stats;

pub use adaptive::{ALPHA_BRACKET, SearchOutcome, SearchResult, SearchTrial, search_for_target};
pub use apply::Backboner;
pub use config::{Algorithm, BackboningConfig, ChunkingConfig, DEFAULT_ALPHA, TargetReduction};
pub use stats::BackboningStatistics;
