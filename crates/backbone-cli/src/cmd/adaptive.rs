//! `backbone adaptive`: search α (or the threshold) for a target reduction.

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use super::{InputArgs, OutputArgs, execute_job};
use crate::config::{JobSettings, resolve_settings};
use crate::output::OutputMode;

/// Arguments for `backbone adaptive`.
#[derive(Args, Debug, Clone, Default)]
pub struct AdaptiveArgs {
    /// Fraction of edges to remove, in [0, 1). Falls back to
    /// `target_reduction` from the config file or preset.
    #[arg(long, short = 't')]
    pub target: Option<f64>,

    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub settings: JobSettings,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Execute `backbone adaptive`.
pub fn run_adaptive(args: &AdaptiveArgs, file: Option<JobSettings>, mode: OutputMode) -> Result<()> {
    let mut settings = resolve_settings(file, args.settings.clone());
    settings.target_reduction = args.target.or(settings.target_reduction);
    if settings.target_reduction.is_none() {
        anyhow::bail!("no target reduction: pass --target or set target_reduction in the config");
    }

    let report = execute_job(&args.input, &settings, &args.output, mode)?;
    if let Some(search) = &report.search {
        if search.converged {
            info!(
                iterations = search.iterations,
                parameter = search.parameter,
                achieved = search.achieved_reduction,
                "search converged"
            );
        } else {
            warn!(
                iterations = search.iterations,
                deviation = search.relative_deviation,
                "search stopped outside tolerance"
            );
        }
    }
    if report.is_valid() {
        Ok(())
    } else {
        anyhow::bail!("backbone failed validation")
    }
}
