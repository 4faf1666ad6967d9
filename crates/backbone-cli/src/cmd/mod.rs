//! Subcommand handlers and the job pipeline they share.

pub mod adaptive;
pub mod run;
pub mod validate;

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use backbone_core::filter::disparity_scores;
use backbone_core::graph::{BuildReport, DuplicatePolicy};
use backbone_core::{
    BackboneReport, BipartiteMode, GraphBuilder, GraphDocument, ReportBuilder, ValidationReport, Validator, WeightedGraph,
    run_backboning, search_for_target,
};
use clap::Args;
use tracing::{debug, info};

use crate::config::JobSettings;
use crate::output::{OutputMode, percent, pretty_kv, pretty_section, render_mode, text_kv};

/// Edge attribute carrying the smallest α at which the edge survives.
pub const SCORE_ATTRIBUTE: &str = "significance";

/// Where the graph comes from and how rows become a graph.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Graph document (JSON). Reads stdin when absent or `-`.
    pub input: Option<PathBuf>,

    /// Fail on non-finite weights and invalid ids instead of repairing them.
    #[arg(long)]
    pub strict: bool,

    /// Treat edges as directed even if the document does not say so.
    #[arg(long)]
    pub directed: bool,

    /// How rows repeating a node pair merge: sum, max or keep_first.
    #[arg(long, value_parser = parse_duplicates)]
    pub duplicates: Option<DuplicatePolicy>,
}

/// What to do with the backbone besides summarizing it.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Write the backbone document here (`-` for stdout, replacing the summary).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Attach each edge's disparity significance as a `significance` attribute.
    #[arg(long)]
    pub scores: bool,

    /// Validate the backbone against the input and include the findings.
    #[arg(long)]
    pub validate: bool,
}

fn parse_duplicates(raw: &str) -> Result<DuplicatePolicy, String> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "sum" => Ok(DuplicatePolicy::Sum),
        "max" => Ok(DuplicatePolicy::Max),
        "keep_first" | "first" => Ok(DuplicatePolicy::KeepFirst),
        other => Err(format!("unknown duplicate policy {other:?} (expected sum, max or keep_first)")),
    }
}

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

fn is_stdio(path: Option<&Path>) -> bool {
    path.is_none_or(|p| p.as_os_str() == "-")
}

/// Parse a [`GraphDocument`] from `path`, or from stdin.
pub fn read_document(path: Option<&Path>) -> Result<GraphDocument> {
    let raw = match path {
        Some(p) if !is_stdio(Some(p)) => {
            fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))?
        }
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
            buf
        }
    };
    let source = path.map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse graph document from {source}"))
}

/// Read and build the input graph.
pub fn load_graph(args: &InputArgs) -> Result<(WeightedGraph, BuildReport)> {
    let mut document = read_document(args.input.as_deref())?;
    document.directed |= args.directed;
    let builder = GraphBuilder::new()
        .strict(args.strict)
        .duplicates(args.duplicates.unwrap_or_default());
    let (graph, report) = document.into_graph(builder).context("Failed to build graph")?;
    debug!(nodes = report.nodes, edges = report.edges, rows = report.rows, "input graph built");
    Ok((graph, report))
}

/// Write `document` as pretty JSON to `path` (stdout for `-`).
pub fn write_document(path: &Path, document: &GraphDocument) -> Result<()> {
    if is_stdio(Some(path)) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, document)?;
        writeln!(out)?;
    } else {
        let mut file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(&mut file, document)?;
        writeln!(file)?;
        info!(path = %path.display(), edges = document.edges.len(), "backbone written");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Job pipeline
// ---------------------------------------------------------------------------

/// Build → weight model → backbone (optionally searched) → validate → report.
pub fn execute_job(
    input: &InputArgs,
    settings: &JobSettings,
    outputs: &OutputArgs,
    mode: OutputMode,
) -> Result<BackboneReport> {
    let (graph, build) = load_graph(input)?;
    let graph = settings.prepare_weights(graph);
    let config = settings.backboning_config()?;

    let (backbone, statistics, search) = match config.target {
        Some(target) => {
            let result = search_for_target(&graph, &config, target)?;
            (result.graph, result.statistics, Some(result.outcome))
        }
        None => {
            let (backbone, statistics) = run_backboning(&graph, &config)?;
            (backbone, statistics, None)
        }
    };

    let mut builder = ReportBuilder::new(&graph, statistics).build_report(build);
    if let Some(outcome) = search {
        builder = builder.search(outcome);
    }
    if outputs.validate {
        builder = builder.validation(Validator::default().validate(&graph, &backbone));
    }
    let report = builder.finish();

    if let Some(path) = &outputs.output {
        let mut document = report.to_document(&backbone)?;
        if outputs.scores {
            attach_scores(&mut document, &graph, config.bipartite);
        }
        write_document(path, &document)?;
        if is_stdio(Some(path)) {
            return Ok(report);
        }
    }
    render_report(mode, &report)?;
    Ok(report)
}

fn attach_scores(document: &mut GraphDocument, graph: &WeightedGraph, bipartite: BipartiteMode) {
    let scores: HashMap<(String, String), f64> = disparity_scores(graph, bipartite)
        .into_iter()
        .zip(graph.petgraph().edge_indices())
        .filter_map(|(score, idx)| Some((graph.edge_key(idx)?, score?)))
        .collect();
    for edge in &mut document.edges {
        let key = if document.directed || edge.source <= edge.target {
            (edge.source.clone(), edge.target.clone())
        } else {
            (edge.target.clone(), edge.source.clone())
        };
        if let Some(score) = scores.get(&key) {
            edge.attributes.insert(SCORE_ATTRIBUTE.to_string(), (*score).into());
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

/// Summarize a job report in the requested mode.
pub fn render_report(mode: OutputMode, report: &BackboneReport) -> Result<()> {
    render_mode(mode, report, render_report_text, render_report_pretty)
}

fn render_report_text(report: &BackboneReport, w: &mut dyn Write) -> io::Result<()> {
    let s = &report.statistics;
    text_kv(w, "algorithm", s.algorithm.name())?;
    text_kv(w, "alpha", fmt_opt(s.algorithm.alpha()))?;
    text_kv(w, "nodes", format!("{} -> {}", s.original_nodes, s.backbone_nodes))?;
    text_kv(w, "edges", format!("{} -> {}", s.original_edges, s.backbone_edges))?;
    text_kv(w, "reduction", format!("{:.2}%", s.reduction_pct))?;
    text_kv(w, "weight_retention", format!("{:.2}%", s.weight_retention_pct))?;
    text_kv(w, "threshold", fmt_opt(s.threshold_used))?;
    if let Some(search) = &report.search {
        text_kv(w, "search_iterations", search.iterations)?;
        text_kv(w, "search_converged", search.converged)?;
        text_kv(w, "search_parameter", format!("{:.6}", search.parameter))?;
    }
    if let Some(validation) = &report.validation {
        render_validation_text(validation, w)?;
    }
    for note in &report.notes {
        text_kv(w, "note", note)?;
    }
    Ok(())
}

fn render_report_pretty(report: &BackboneReport, w: &mut dyn Write) -> io::Result<()> {
    let s = &report.statistics;
    pretty_section(w, "Backbone")?;
    pretty_kv(w, "algorithm", s.algorithm.name())?;
    if let Some(alpha) = s.algorithm.alpha() {
        pretty_kv(w, "alpha", format!("{alpha}"))?;
    }
    pretty_kv(w, "nodes", format!("{} → {}", s.original_nodes, s.backbone_nodes))?;
    pretty_kv(
        w,
        "edges",
        format!("{} → {} ({} removed)", s.original_edges, s.backbone_edges, s.edges_removed),
    )?;
    pretty_kv(w, "reduction", format!("{:.1}%", s.reduction_pct))?;
    pretty_kv(w, "weight kept", format!("{:.1}%", s.weight_retention_pct))?;
    pretty_kv(
        w,
        "avg degree",
        format!("{:.2} → {:.2}", s.avg_degree_before, s.avg_degree_after),
    )?;
    if let Some(threshold) = s.threshold_used {
        pretty_kv(w, "threshold", format!("{threshold:.4}"))?;
    }
    if let Some(chunks) = s.chunked_components {
        pretty_kv(w, "components", format!("{chunks} (chunked)"))?;
    }
    pretty_kv(w, "time", format!("{} ms", s.duration_ms))?;
    pretty_kv(w, "input hash", &report.input_hash)?;

    if let Some(search) = &report.search {
        writeln!(w)?;
        pretty_section(w, "Search")?;
        pretty_kv(
            w,
            "target",
            format!("{} ({} edges)", percent(search.target_reduction), search.target_edges),
        )?;
        pretty_kv(
            w,
            "achieved",
            format!("{} ({} edges)", percent(search.achieved_reduction), search.achieved_edges),
        )?;
        pretty_kv(w, "parameter", format!("{:.6}", search.parameter))?;
        pretty_kv(
            w,
            "iterations",
            format!(
                "{} ({})",
                search.iterations,
                if search.converged { "converged" } else { "best effort" }
            ),
        )?;
    }

    if let Some(validation) = &report.validation {
        writeln!(w)?;
        render_validation_pretty(validation, w)?;
    }

    if !report.notes.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Notes")?;
        for note in &report.notes {
            writeln!(w, "  • {note}")?;
        }
    }
    Ok(())
}

/// `key=value` lines for a validation report.
pub fn render_validation_text(report: &ValidationReport, w: &mut dyn Write) -> io::Result<()> {
    text_kv(w, "valid", report.valid)?;
    for (metric, value) in &report.metrics {
        text_kv(w, metric, format!("{value:.4}"))?;
    }
    for error in &report.errors {
        text_kv(w, "error", error)?;
    }
    for warning in &report.warnings {
        text_kv(w, "warning", warning)?;
    }
    Ok(())
}

/// Framed section for a validation report.
pub fn render_validation_pretty(report: &ValidationReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Validation")?;
    pretty_kv(w, "valid", if report.valid { "yes" } else { "NO" })?;
    for (metric, value) in &report.metrics {
        pretty_kv(w, &metric.replace('_', " "), percent(*value))?;
    }
    for error in &report.errors {
        writeln!(w, "  ✗ {error}")?;
    }
    for warning in &report.warnings {
        writeln!(w, "  ! {warning}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backbone_core::{BackboningConfig, build_graph};

    fn sample_report() -> BackboneReport {
        let graph = build_graph([("A", "B", 10.0), ("A", "C", 1.0), ("A", "D", 1.0), ("B", "C", 5.0)]).expect("graph");
        let (backbone, stats) = run_backboning(&graph, &BackboningConfig::default()).expect("backbone");
        ReportBuilder::new(&graph, stats)
            .validation(Validator::default().validate(&graph, &backbone))
            .finish()
    }

    #[test]
    fn parse_duplicates_accepts_aliases() {
        assert_eq!(parse_duplicates("keep-first"), Ok(DuplicatePolicy::KeepFirst));
        assert_eq!(parse_duplicates("MAX"), Ok(DuplicatePolicy::Max));
        assert!(parse_duplicates("avg").is_err());
    }

    #[test]
    fn text_report_lists_counts() {
        let mut buf = Vec::new();
        render_report_text(&sample_report(), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("algorithm=disparity_filter"), "{text}");
        assert!(text.contains("edges=4 -> 2"), "{text}");
        assert!(text.contains("valid=true"), "{text}");
    }

    #[test]
    fn pretty_report_has_sections() {
        let mut buf = Vec::new();
        render_report_pretty(&sample_report(), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("Backbone\n"));
        assert!(text.contains("Validation"));
    }

    #[test]
    fn scores_attach_to_surviving_edges() {
        let graph = build_graph([("B", "A", 10.0), ("A", "C", 1.0)]).expect("graph");
        let mut document = GraphDocument::from_graph(&graph);
        attach_scores(&mut document, &graph, BipartiteMode::Symmetric);
        assert!(
            document.edges.iter().all(|e| e.attributes.contains_key(SCORE_ATTRIBUTE)),
            "{document:?}"
        );
    }
}
