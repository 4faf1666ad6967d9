//! Job settings: network-kind presets, a TOML file, and command-line flags.
//!
//! All three are the same flat [`JobSettings`] shape with every field
//! optional. Resolution layers them preset → file → flags, later layers
//! winning field by field, then turns the result into a
//! [`BackboningConfig`] plus the weight-model steps to run first.

use std::path::Path;

use anyhow::{Context, Result};
use backbone_core::backbone::ChunkingConfig;
use backbone_core::weight::{self, Combinator, NormalizeMethod};
use backbone_core::{Algorithm, BackboningConfig, BipartiteMode, TargetReduction, WeightedGraph};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

/// Starting points tuned per kind of network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Sparse relational networks: lenient, α = 0.1.
    Relational,
    /// Term co-occurrence networks: α = 0.05.
    Term,
    /// Dense concept networks: α = 0.01, searching for 80% reduction.
    Concept,
}

impl Preset {
    #[must_use]
    pub fn settings(self) -> JobSettings {
        let disparity = |alpha: f64| JobSettings {
            algorithm: Some("disparity_filter".to_string()),
            alpha: Some(alpha),
            ..JobSettings::default()
        };
        match self {
            Self::Relational => disparity(0.1),
            Self::Term => disparity(0.05),
            Self::Concept => JobSettings {
                target_reduction: Some(0.8),
                tolerance: Some(0.05),
                max_iterations: Some(20),
                ..disparity(0.01)
            },
        }
    }
}

/// Every tunable of a job. Doubles as the TOML schema and the clap flag set.
#[derive(Debug, Clone, Default, PartialEq, Args, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobSettings {
    /// Network-kind preset applied before the file and the flags.
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Significance filter: disparity_filter, noise_corrected or threshold.
    #[arg(long, short = 'a')]
    pub algorithm: Option<String>,

    /// Significance level for the statistical filters, in (0, 1].
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Fixed weight cut for `threshold`; the median is used when absent.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Drop edges lighter than this after filtering.
    #[arg(long)]
    pub min_weight: Option<f64>,

    /// Drop edges touching nodes whose backbone degree is below this.
    #[arg(long)]
    pub min_degree: Option<usize>,

    /// Keep nodes that end up with no edges.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub retain_disconnected: Option<bool>,

    /// Only nodes of this partition cast significance votes.
    #[arg(long)]
    pub bipartite_from: Option<u8>,

    /// Fraction of edges to remove; enables the α search.
    #[arg(long)]
    pub target_reduction: Option<f64>,

    /// Accepted relative deviation from the target edge count.
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Search iteration cap.
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Edge count above which component chunking kicks in.
    #[arg(long)]
    pub chunk_edges: Option<usize>,

    /// Worker threads for chunked filtering.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Normalize weights before filtering (min_max, z_score, log1p, identity).
    #[arg(long)]
    pub normalize: Option<NormalizeMethod>,

    /// Treat weights as ranks (lower is better) and invert them first.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub invert_rank: Option<bool>,

    /// Edge attributes folded into the working weight (`weight` is the primary weight).
    #[arg(long, value_delimiter = ',')]
    pub combine: Option<Vec<String>>,

    /// How `--combine` folds attributes (product, sum, average, max, min).
    #[arg(long)]
    pub combinator: Option<Combinator>,
}

macro_rules! overlay_fields {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {
        JobSettings { $($field: $over.$field.or($base.$field)),+ }
    };
}

impl JobSettings {
    /// Field-wise merge; `over` wins wherever it is set.
    #[must_use]
    pub fn overlay(self, over: Self) -> Self {
        overlay_fields!(
            self,
            over,
            preset,
            algorithm,
            alpha,
            threshold,
            min_weight,
            min_degree,
            retain_disconnected,
            bipartite_from,
            target_reduction,
            tolerance,
            max_iterations,
            chunk_edges,
            workers,
            normalize,
            invert_rank,
            combine,
            combinator,
        )
    }

    /// Build the engine configuration. `target` is set only when a target
    /// reduction was requested.
    ///
    /// # Errors
    ///
    /// Unknown algorithm names and out-of-domain values.
    pub fn backboning_config(&self) -> Result<BackboningConfig> {
        let name = self.algorithm.as_deref().unwrap_or("disparity_filter");
        let algorithm = Algorithm::from_name(name, self.alpha, self.threshold)?;

        let mut chunking = ChunkingConfig::default();
        if let Some(edges) = self.chunk_edges {
            chunking.edge_threshold = edges;
        }
        chunking.max_workers = self.workers;

        let mut config = BackboningConfig::new(algorithm)
            .retain_disconnected(self.retain_disconnected.unwrap_or(false))
            .with_bipartite(self.bipartite_from.map_or(BipartiteMode::Symmetric, BipartiteMode::FromPartition))
            .with_chunking(chunking);
        config.min_weight = self.min_weight;
        config.min_degree = self.min_degree;

        if let Some(ratio) = self.target_reduction {
            let mut target = TargetReduction::new(ratio);
            if let Some(tolerance) = self.tolerance {
                target = target.with_tolerance(tolerance);
            }
            if let Some(iterations) = self.max_iterations {
                target = target.with_max_iterations(iterations);
            }
            config = config.with_target(target);
        }

        config.validate()?;
        Ok(config)
    }

    /// Run the weight-model steps in order: combine, invert rank, normalize.
    #[must_use]
    pub fn prepare_weights(&self, graph: WeightedGraph) -> WeightedGraph {
        let mut graph = graph;
        if let Some(attributes) = self.combine.as_deref().filter(|a| !a.is_empty()) {
            let keys: Vec<&str> = attributes.iter().map(String::as_str).collect();
            graph = weight::combine(&graph, &keys, self.combinator.unwrap_or(Combinator::Product));
        }
        if self.invert_rank.unwrap_or(false) {
            graph = weight::invert_rank(&graph);
        }
        match self.normalize {
            Some(method) if method != NormalizeMethod::Identity => weight::normalize(&graph, method),
            _ => graph,
        }
    }
}

/// Read a TOML settings file.
///
/// # Errors
///
/// I/O failures and TOML that does not match [`JobSettings`].
pub fn load_settings(path: &Path) -> Result<JobSettings> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str::<JobSettings>(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Layer preset → file → flags. The preset comes from the flags when given
/// there, otherwise from the file.
#[must_use]
pub fn resolve_settings(file: Option<JobSettings>, flags: JobSettings) -> JobSettings {
    let file = file.unwrap_or_default();
    let preset = flags.preset.or(file.preset);
    let base = preset.map(Preset::settings).unwrap_or_default();
    base.overlay(file).overlay(flags)
}
