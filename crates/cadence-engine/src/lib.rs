pub mod categorize;
pub mod collect;
pub mod config;
pub mod direct;
pub mod distill;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod trends;

pub use categorize::{
    CategorizeRequest, Categorizer, ClaudeCategorizer, Classification, MockCategorizer,
    NoopCategorizer,
};
pub use collect::{CollectOptions, Collector, CollectorOutput, FileCollector, MockCollector};
pub use config::{load_config, parse_config, CategorizerKind, ConfigCell, EngineConfig};
pub use error::{CategorizeError, EngineError};
pub use orchestrator::{GenerationRequest, Orchestrator};
pub use plan::{plan_generation, Target};
pub use report::{GenerationReport, Warning, WarningKind};
