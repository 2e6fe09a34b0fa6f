pub mod error;
pub mod hash;
pub mod period;
pub mod stats;
pub mod types;

pub use error::PeriodError;
pub use period::{DateRange, Fidelity};
pub use stats::{SummaryStats, TodoProgress};
pub use types::*;
