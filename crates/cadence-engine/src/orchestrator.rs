use std::collections::HashMap;
use std::sync::Arc;

use cadence_core::period::previous_period;
use cadence_core::{DateRange, Fidelity, SummaryDocument};
use cadence_store::DocumentStore;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::categorize::Categorizer;
use crate::collect::Collector;
use crate::config::EngineConfig;
use crate::direct::generate_direct;
use crate::distill::distill;
use crate::error::EngineError;
use crate::plan::{plan_generation, Target};
use crate::report::{GenerationReport, Warning, WarningKind};
use crate::trends::analyze_trends;

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub fidelity: Fidelity,
    pub period: String,
    /// Rebuild even if the document exists. Applies to the target only.
    pub force: bool,
    /// Build missing source documents first.
    pub deps: bool,
    /// Build everything in memory; write nothing.
    pub dry_run: bool,
    /// Explicit range for the target instead of the period's own.
    pub range: Option<DateRange>,
}

impl GenerationRequest {
    pub fn new(fidelity: Fidelity, period: impl Into<String>) -> Self {
        Self {
            fidelity,
            period: period.into(),
            force: false,
            deps: false,
            dry_run: false,
            range: None,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn deps(mut self, deps: bool) -> Self {
        self.deps = deps;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// Builds summary documents, daily ones from the collectors and coarser ones
/// by distilling stored documents one level finer.
pub struct Orchestrator {
    config: Arc<EngineConfig>,
    store: Arc<dyn DocumentStore>,
    collectors: Vec<Arc<dyn Collector>>,
    categorizer: Arc<dyn Categorizer>,
}

/// Per-call state: documents built so far and accumulated warnings.
#[derive(Default)]
struct Run {
    built: HashMap<Target, SummaryDocument>,
    warnings: Vec<Warning>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<EngineConfig>,
        store: Arc<dyn DocumentStore>,
        categorizer: Arc<dyn Categorizer>,
    ) -> Self {
        Self {
            config,
            store,
            collectors: Vec::new(),
            categorizer,
        }
    }

    pub fn with_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn with_collectors(mut self, collectors: impl IntoIterator<Item = Arc<dyn Collector>>) -> Self {
        self.collectors.extend(collectors);
        self
    }

    /// Build, or fetch, the document for `request`.
    ///
    /// An existing document is returned untouched unless `force` is set. With
    /// `deps`, missing source documents are built first, finest first, each
    /// persisted as soon as it is built. Fails on a malformed period, a store
    /// error, or when a distilled target has no source documents at all.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationReport, EngineError> {
        let target = Target::new(request.fidelity, request.period.clone());
        target.range()?;

        if !request.force {
            if let Some(document) = self.store.load(target.fidelity, &target.period)? {
                tracing::info!(fidelity = %target.fidelity, period = %target.period, "using stored summary");
                return Ok(GenerationReport {
                    document,
                    cache_hit: true,
                    generated: Vec::new(),
                    warnings: Vec::new(),
                    persisted: false,
                });
            }
        }

        let work = plan_generation(&target, request.deps, |t| {
            self.store.exists(t.fidelity, &t.period)
        })?;
        tracing::info!(
            fidelity = %target.fidelity,
            period = %target.period,
            documents = work.len(),
            dry_run = request.dry_run,
            "generation planned"
        );

        let mut run = Run::default();
        let mut generated = Vec::with_capacity(work.len());
        for next in work {
            let is_target = next == target;
            let range = match request.range {
                Some(range) if is_target => range,
                _ => next.range()?,
            };

            let mut doc = match self.build(&next, range, &mut run).await {
                Ok(doc) => doc,
                Err(EngineError::NoSourceSummariesAvailable { .. }) if !is_target => {
                    tracing::warn!(fidelity = %next.fidelity, period = %next.period, "dependency has no sources, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if request.dry_run {
                doc.file_path = None;
            } else {
                self.store.save(&doc)?;
                tracing::info!(id = %doc.id, items = doc.stats.total_items, "summary saved");
            }
            generated.push(next.clone());
            run.built.insert(next, doc);
        }

        let document = run
            .built
            .remove(&target)
            .ok_or_else(|| anyhow::anyhow!("{target} was planned but not built"))?;
        Ok(GenerationReport {
            document,
            cache_hit: false,
            generated,
            warnings: run.warnings,
            persisted: !request.dry_run,
        })
    }

    async fn build(
        &self,
        target: &Target,
        range: DateRange,
        run: &mut Run,
    ) -> Result<SummaryDocument, EngineError> {
        let mut doc = match target.fidelity.source() {
            None => {
                tracing::debug!(period = %target.period, "direct generation");
                let collectors: Vec<Arc<dyn Collector>> = self
                    .collectors
                    .iter()
                    .filter(|c| !self.config.disabled_sources.contains(&c.source()))
                    .cloned()
                    .collect();
                let (doc, warnings) = generate_direct(
                    &target.period,
                    range,
                    &collectors,
                    self.categorizer.as_ref(),
                    timestamp(),
                )
                .await;
                run.warnings.extend(warnings);
                doc
            }
            Some(source_fidelity) => {
                let mut sources = Vec::new();
                let mut missing = Vec::new();
                for source in target.sources()? {
                    match self.lookup(&source, run)? {
                        Some(doc) => sources.push(doc),
                        None => missing.push(source.period),
                    }
                }
                if sources.is_empty() {
                    return Err(EngineError::NoSourceSummariesAvailable {
                        fidelity: target.fidelity,
                        source_fidelity,
                        period: target.period.clone(),
                        missing,
                    });
                }
                for period in &missing {
                    tracing::warn!(fidelity = %target.fidelity, period = %target.period, missing = %period, "source summary missing");
                    run.warnings.push(Warning::new(
                        WarningKind::MissingSourceSummary,
                        format!("{target}: no {source_fidelity} summary for {period}"),
                    ));
                }
                tracing::debug!(
                    fidelity = %target.fidelity,
                    period = %target.period,
                    sources = sources.len(),
                    "distilling"
                );
                distill(target.fidelity, &target.period, range, &sources, timestamp())
            }
        };

        if doc.fidelity != Fidelity::Daily {
            let (previous, history) = self.history(target, run)?;
            let (trends, warning) = analyze_trends(
                &doc,
                previous.as_ref(),
                &history,
                self.categorizer.as_ref(),
                &self.config.trends,
            )
            .await;
            run.warnings.extend(warning);
            doc.trends = Some(trends);
        }

        doc.file_path = self.store.location(doc.fidelity, &doc.period);
        Ok(doc)
    }

    /// A document built in this run, or else the stored one.
    fn lookup(&self, target: &Target, run: &Run) -> Result<Option<SummaryDocument>, EngineError> {
        if let Some(doc) = run.built.get(target) {
            return Ok(Some(doc.clone()));
        }
        Ok(self.store.load(target.fidelity, &target.period)?)
    }

    /// The immediately preceding document, and every available document in
    /// the trend window, most recent first.
    fn history(
        &self,
        target: &Target,
        run: &Run,
    ) -> Result<(Option<SummaryDocument>, Vec<SummaryDocument>), EngineError> {
        let mut previous = None;
        let mut history = Vec::new();
        let mut period = target.period.clone();
        for step in 0..self.config.trends.history_window.max(1) {
            period = previous_period(target.fidelity, &period)?;
            let Some(doc) = self.lookup(&Target::new(target.fidelity, period.clone()), run)? else {
                continue;
            };
            if step == 0 {
                previous = Some(doc.clone());
            }
            if step < self.config.trends.history_window {
                history.push(doc);
            }
        }
        Ok((previous, history))
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339).unwrap_or_else(|_| now.to_string())
}
