use cadence_core::{Fidelity, PeriodError};
use thiserror::Error;

/// Fatal outcomes of a generation request. Recoverable collaborator failures
/// never reach this type; they are reported as [`Warning`](crate::Warning)s.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error("no {source_fidelity} summaries available to build {fidelity} {period} (missing: {})", missing.join(", "))]
    NoSourceSummariesAvailable {
        fidelity: Fidelity,
        source_fidelity: Fidelity,
        period: String,
        missing: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Why the categorization service produced no usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategorizeError {
    #[error("categorizer unavailable: {0}")]
    Unavailable(String),

    #[error("categorizer timed out after {0}s")]
    Timeout(u64),

    #[error("categorizer process failed: {0}")]
    Process(String),

    #[error("malformed categorizer response: {0}")]
    Malformed(String),
}
