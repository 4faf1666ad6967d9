//! `backbone validate`: compare a backbone document against its input.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use backbone_core::{GraphBuilder, ValidationReport, Validator, ValidatorConfig, WeightKey, WeightedGraph};
use clap::Args;
use tracing::info;

use super::{read_document, render_validation_pretty, render_validation_text};
use crate::output::{OutputMode, render_mode};

/// Arguments for `backbone validate`.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// The graph the backbone was extracted from.
    pub original: PathBuf,

    /// The backbone document.
    pub backbone: PathBuf,

    /// Edge attribute to measure weight preservation on, instead of the
    /// effective weight.
    #[arg(long)]
    pub weight_key: Option<String>,

    /// Node pairs sampled for connectivity on large graphs.
    #[arg(long, default_value_t = 1000)]
    pub sample_cap: usize,

    /// Seed for the connectivity sample.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

fn load(path: &Path) -> Result<WeightedGraph> {
    let document = read_document(Some(path))?;
    let (graph, _) = document
        .into_graph(GraphBuilder::new())
        .with_context(|| format!("Failed to build graph from {}", path.display()))?;
    Ok(graph)
}

/// Execute `backbone validate`. Fails when a structural check fails.
pub fn run_validate(args: &ValidateArgs, mode: OutputMode) -> Result<()> {
    let original = load(&args.original)?;
    let backbone = load(&args.backbone)?;

    let validator = Validator::new(ValidatorConfig {
        weight_key: args
            .weight_key
            .clone()
            .map_or(WeightKey::Effective, WeightKey::Attribute),
        sample_cap: args.sample_cap,
        seed: args.seed,
    });
    let report: ValidationReport = validator.validate(&original, &backbone);
    info!(valid = report.valid, errors = report.errors.len(), warnings = report.warnings.len(), "validated");

    render_mode(mode, &report, render_validation_text, render_validation_pretty)?;
    if report.valid {
        Ok(())
    } else {
        anyhow::bail!("backbone failed validation ({} error(s))", report.errors.len())
    }
}
