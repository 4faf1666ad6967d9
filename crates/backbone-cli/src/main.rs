#![forbid(unsafe_code)]

mod cmd;
mod config;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "backbone: extract the statistically significant backbone of a weighted graph",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty, text or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// TOML settings file; flags override its values.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Extract a backbone with fixed parameters",
        long_about = "Read a graph document, run one significance filter, and summarize what survived.",
        after_help = "EXAMPLES:\n    # Disparity filter at the default α = 0.05\n    backbone run graph.json -o backbone.json\n\n    # Noise-corrected filter with per-edge scores, validated\n    backbone run graph.json --algorithm noise_corrected --alpha 0.01 --scores --validate -o bb.json\n\n    # Concept-network preset from stdin, document to stdout\n    cat graph.json | backbone run --preset concept -o -"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        about = "Search α for a target edge reduction",
        long_about = "Bisect the filter parameter until the backbone removes the requested fraction of edges, within tolerance.",
        after_help = "EXAMPLES:\n    # Remove about half of the edges\n    backbone adaptive graph.json --target 0.5\n\n    # Tighter tolerance, more iterations, JSON summary\n    backbone adaptive graph.json -t 0.8 --tolerance 0.02 --max-iterations 40 --json"
    )]
    Adaptive(cmd::adaptive::AdaptiveArgs),

    #[command(
        about = "Validate a backbone against its input",
        long_about = "Check structural consistency and report weight, connectivity and community preservation.",
        after_help = "EXAMPLES:\n    # Validate and print metrics\n    backbone validate graph.json backbone.json\n\n    # Measure preservation on a raw attribute\n    backbone validate graph.json backbone.json --weight-key count"
    )]
    Validate(cmd::validate::ValidateArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BACKBONE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "backbone=debug,info"
        } else {
            "backbone=info,warn"
        })
    });

    let format = env::var("BACKBONE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = resolve_output_mode(cli.format, cli.json);
    let file_settings = cli.config.as_deref().map(config::load_settings).transpose()?;
    debug!(from_file = file_settings.is_some(), "settings loaded");

    let command_result = match cli.command {
        Commands::Run(ref args) => cmd::run::run_run(args, file_settings, output),
        Commands::Adaptive(ref args) => cmd::adaptive::run_adaptive(args, file_settings, output),
        Commands::Validate(ref args) => cmd::validate::run_validate(args, output),
    };

    if let Err(err) = &command_result
        && output.is_json()
    {
        render_error(output, &CliError::from_anyhow(err))?;
        std::process::exit(1);
    }
    command_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["backbone", "run", "g.json", "--json", "--alpha", "0.1"]);
        assert!(cli.json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.settings.alpha, Some(0.1));
                assert_eq!(args.input.input, Some(PathBuf::from("g.json")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn retain_disconnected_is_a_bare_flag() {
        let cli = Cli::parse_from(["backbone", "run", "--retain-disconnected"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.settings.retain_disconnected, Some(true));
    }

    #[test]
    fn adaptive_takes_target_and_combine_list() {
        let cli = Cli::parse_from(["backbone", "adaptive", "-t", "0.5", "--combine", "weight,count"]);
        let Commands::Adaptive(args) = cli.command else {
            panic!("expected adaptive");
        };
        assert_eq!(args.target, Some(0.5));
        assert_eq!(args.settings.combine, Some(vec!["weight".to_string(), "count".to_string()]));
    }
}
