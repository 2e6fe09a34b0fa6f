use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use cadence_core::period::parse_date;
use cadence_core::{DateRange, Fidelity};
use cadence_engine::{
    CategorizerKind, Categorizer, ClaudeCategorizer, Collector, ConfigCell, EngineConfig,
    FileCollector, GenerationReport, GenerationRequest, NoopCategorizer, Orchestrator,
};
use cadence_store::{CadencePaths, FsDocumentStore, GenerationLock};

use crate::cmd_period::current_period;

pub struct GenerateParams<'a> {
    pub root: &'a Path,
    pub fidelity: Fidelity,
    pub period: Option<&'a str>,
    pub force: bool,
    pub deps: bool,
    pub dry_run: bool,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
    pub json: bool,
}

/// Execute `cadence generate <fidelity> [period]`
pub fn execute(params: &GenerateParams<'_>) -> Result<()> {
    let paths = CadencePaths::discover(params.root);
    let cell = ConfigCell::new(&paths.config_yaml);
    let config = cell.get()?;
    tracing::debug!(
        config = %cell.path().display(),
        collectors = config.active_collectors().count(),
        categorizer = ?config.categorizer.kind,
        "config loaded"
    );

    let period = params
        .period
        .map(str::to_string)
        .unwrap_or_else(|| current_period(params.fidelity));
    let mut request = GenerationRequest::new(params.fidelity, period)
        .force(params.force)
        .deps(params.deps)
        .dry_run(params.dry_run);
    if let Some(range) = range_override(params.start, params.end)? {
        request = request.with_range(range);
    }

    // Held until the run finishes; dry runs write nothing and skip it.
    let _lock = if params.dry_run {
        None
    } else {
        paths.ensure_layout()?;
        Some(GenerationLock::acquire(&paths)?)
    };

    let orchestrator = build_orchestrator(&paths, config);
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(orchestrator.generate(&request))?;

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if params.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn range_override(start: Option<&str>, end: Option<&str>) -> Result<Option<DateRange>> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let range = DateRange::new(parse_date(start)?, parse_date(end)?);
            if range.start > range.end {
                bail!("--start {start} is after --end {end}");
            }
            Ok(Some(range))
        }
        _ => bail!("--start and --end must be given together"),
    }
}

fn build_orchestrator(paths: &CadencePaths, config: Arc<EngineConfig>) -> Orchestrator {
    let categorizer: Arc<dyn Categorizer> = match config.categorizer.kind {
        CategorizerKind::Claude => Arc::new(ClaudeCategorizer::from_config(&config.categorizer)),
        CategorizerKind::None => Arc::new(NoopCategorizer),
    };
    let collectors: Vec<Arc<dyn Collector>> = config
        .active_collectors()
        .map(|c| {
            Arc::new(FileCollector::new(c.source, c.resolve_path(&paths.root)))
                as Arc<dyn Collector>
        })
        .collect();
    let store = Arc::new(FsDocumentStore::new(paths.clone()));
    Orchestrator::new(config, store, categorizer).with_collectors(collectors)
}

fn print_report(report: &GenerationReport) {
    let doc = &report.document;
    let counts = &doc.stats.by_category;
    if report.cache_hit {
        println!(
            "Using stored {} {} (--force to regenerate)",
            doc.fidelity, doc.period
        );
    } else {
        println!("Generated {} {} ({})", doc.fidelity, doc.period, doc.date_range);
    }
    println!(
        "  items: {} (engineering {}, management {}, business {}), action items: {}",
        doc.stats.total_items,
        counts.engineering,
        counts.management,
        counts.business,
        doc.stats.action_items
    );
    if report.generated.len() > 1 {
        println!(
            "  built {} documents ({} dependencies)",
            report.generated.len(),
            report.generated.len() - 1
        );
    }
    if let Some(trends) = &doc.trends {
        println!(
            "  incidents: {} ({}), delivery: {} (previous {})",
            trends.incidents.count,
            trends.incidents.trend,
            trends.delivery.count,
            trends.delivery.previous_count
        );
        for rec in &trends.recommendations {
            println!("  → {rec}");
        }
    }
    match (&doc.file_path, report.persisted || report.cache_hit) {
        (Some(path), true) => println!("  file: {path}"),
        _ => println!("  [dry-run] nothing written"),
    }
}
