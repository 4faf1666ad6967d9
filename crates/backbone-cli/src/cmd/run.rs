//! `backbone run`: one backboning job with fixed parameters.
//!
//! A target reduction coming from the config file or a preset still
//! triggers the search; `backbone adaptive` only makes it mandatory.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{InputArgs, OutputArgs, execute_job};
use crate::config::{JobSettings, resolve_settings};
use crate::output::OutputMode;

/// Arguments for `backbone run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub settings: JobSettings,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Execute `backbone run`.
pub fn run_run(args: &RunArgs, file: Option<JobSettings>, mode: OutputMode) -> Result<()> {
    let settings = resolve_settings(file, args.settings.clone());
    let report = execute_job(&args.input, &settings, &args.output, mode)?;
    info!(
        algorithm = report.statistics.algorithm.name(),
        edges = report.statistics.backbone_edges,
        removed = report.statistics.edges_removed,
        "run complete"
    );
    if report.is_valid() {
        Ok(())
    } else {
        anyhow::bail!("backbone failed validation")
    }
}
