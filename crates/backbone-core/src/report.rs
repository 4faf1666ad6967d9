//! One serializable record per job: how the input was built, what the
//! backboner did, how the search went, and what the validator found.

use serde::{Deserialize, Serialize};

use crate::backbone::{BackboningStatistics, SearchOutcome};
use crate::graph::build::BuildReport;
use crate::graph::document::GraphDocument;
use crate::graph::model::WeightedGraph;
use crate::validate::ValidationReport;

/// Aggregated job report. Embedded as `metadata` in exported documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackboneReport {
    /// Content hash of the input graph, for external job caches.
    pub input_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildReport>,
    pub statistics: BackboningStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    /// Human-readable notes gathered from every stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl BackboneReport {
    /// `true` unless validation ran and found a structural violation.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation.as_ref().is_none_or(|v| v.valid)
    }

    /// Export `backbone` with this report as its metadata block.
    ///
    /// # Errors
    ///
    /// Fails only if the report cannot be represented as JSON.
    pub fn to_document(&self, backbone: &WeightedGraph) -> Result<GraphDocument, serde_json::Error> {
        Ok(GraphDocument::from_graph(backbone).with_metadata(serde_json::to_value(self)?))
    }
}

/// Collects the pieces of a [`BackboneReport`].
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    input_hash: String,
    statistics: BackboningStatistics,
    build: Option<BuildReport>,
    search: Option<SearchOutcome>,
    validation: Option<ValidationReport>,
}

impl ReportBuilder {
    /// Start from the backboner's statistics for `input`.
    #[must_use]
    pub fn new(input: &WeightedGraph, statistics: BackboningStatistics) -> Self {
        Self {
            input_hash: input.content_hash(),
            statistics,
            build: None,
            search: None,
            validation: None,
        }
    }

    #[must_use]
    pub fn build_report(mut self, build: BuildReport) -> Self {
        self.build = Some(build);
        self
    }

    #[must_use]
    pub fn search(mut self, outcome: SearchOutcome) -> Self {
        self.search = Some(outcome);
        self
    }

    #[must_use]
    pub fn validation(mut self, report: ValidationReport) -> Self {
        self.validation = Some(report);
        self
    }

    #[must_use]
    pub fn finish(self) -> BackboneReport {
        let mut notes = Vec::new();
        if let Some(build) = &self.build
            && build.warning_count() > 0
        {
            notes.push(format!(
                "input repaired: {} non-finite weight(s) clamped, {} self-loop(s) skipped, {} invalid id(s) skipped",
                build.non_finite_clamped, build.self_loops_skipped, build.invalid_ids_skipped
            ));
        }
        notes.extend(self.statistics.notes.iter().cloned());
        if let Some(validation) = &self.validation {
            notes.extend(validation.errors.iter().map(|e| format!("error: {e}")));
            notes.extend(validation.warnings.iter().map(|w| format!("warning: {w}")));
        }

        BackboneReport {
            input_hash: self.input_hash,
            build: self.build,
            statistics: self.statistics,
            search: self.search,
            validation: self.validation,
            notes,
        }
    }
}
