use thiserror::Error;

use crate::period::Fidelity;

/// Errors raised by the period calculus. Always caller-facing: nothing can be
/// generated for a period that does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid {fidelity} period {period:?} (expected {expected})")]
    InvalidPeriodFormat {
        fidelity: Fidelity,
        period: String,
        expected: &'static str,
    },

    #[error("unknown fidelity {0:?} (expected one of: daily, weekly, monthly, quarterly, h1-h2, yearly)")]
    UnknownFidelity(String),

    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("date arithmetic left the supported calendar range")]
    OutOfRange,
}
