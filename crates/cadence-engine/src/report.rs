use std::fmt;

use cadence_core::SummaryDocument;
use serde::Serialize;

use crate::plan::Target;

/// Recoverable problems noticed during a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    CollectorFailure,
    CategorizationFailure,
    MissingSourceSummary,
    ThemeExtractionFailure,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::CollectorFailure => "collector_failure",
            WarningKind::CategorizationFailure => "categorization_failure",
            WarningKind::MissingSourceSummary => "missing_source_summary",
            WarningKind::ThemeExtractionFailure => "theme_extraction_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

/// Outcome of [`Orchestrator::generate`](crate::Orchestrator::generate).
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub document: SummaryDocument,
    /// The document was already stored and returned unchanged.
    pub cache_hit: bool,
    /// Every document built in this run, dependencies first.
    pub generated: Vec<Target>,
    pub warnings: Vec<Warning>,
    /// False for dry runs and cache hits.
    pub persisted: bool,
}

impl GenerationReport {
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}
