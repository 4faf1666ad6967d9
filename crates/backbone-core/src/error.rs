use std::fmt;

/// One offending input row, reported by the graph builder in strict mode
/// or by the backboner when an edge carries an unusable weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputIssue {
    /// Zero-based row index in the caller's edge sequence.
    pub row: usize,
    /// Human-readable reason.
    pub reason: String,
}

impl fmt::Display for InputIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.reason)
    }
}

/// Errors returned by the backboning engine.
///
/// Degenerate inputs (empty graph, zero-weight nodes, zero-variance weight
/// distributions) are never errors; they have defined outputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackboneError {
    /// Non-finite weights or invalid node identifiers.
    #[error("malformed input: {}", format_issues(.issues))]
    MalformedInput { issues: Vec<InputIssue> },

    /// The requested algorithm is unknown or not compiled into this build.
    #[error("unsupported backboning algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A configuration value is outside its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backbone grew relative to its input. Always an internal bug.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl BackboneError {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "E1001",
            Self::UnsupportedAlgorithm(_) => "E1002",
            Self::InvalidConfig(_) => "E1003",
            Self::InvariantViolation(_) => "E9001",
        }
    }

    /// Shorthand for a single-row malformed-input error.
    #[must_use]
    pub fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            issues: vec![InputIssue {
                row,
                reason: reason.into(),
            }],
        }
    }
}

fn format_issues(issues: &[InputIssue]) -> String {
    const SHOWN: usize = 5;
    let mut parts: Vec<String> = issues.iter().take(SHOWN).map(ToString::to_string).collect();
    if issues.len() > SHOWN {
        parts.push(format!("and {} more", issues.len() - SHOWN));
    }
    parts.join("; ")
}
