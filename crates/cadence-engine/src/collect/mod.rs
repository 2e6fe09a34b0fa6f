pub mod file;
pub mod mock;

use std::sync::Arc;

use cadence_core::{CollectionState, DateRange, RawItem, SourceStatus, SourceType};

use crate::report::{Warning, WarningKind};

pub use file::FileCollector;
pub use mock::MockCollector;

/// What a collector is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOptions {
    pub range: DateRange,
}

/// Items from one source plus any non-fatal problems hit while reading them.
#[derive(Debug, Clone, Default)]
pub struct CollectorOutput {
    pub items: Vec<RawItem>,
    pub errors: Vec<String>,
}

/// A data source adapter supplying raw work items.
///
/// Implementations report per-item problems through
/// [`CollectorOutput::errors`]; an `Err` (or a panic) marks the whole source
/// as failed for this run without affecting the others.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    fn source(&self) -> SourceType;

    async fn collect(&self, options: &CollectOptions) -> anyhow::Result<CollectorOutput>;
}

/// Items from every collector, kept in collector order.
#[derive(Debug, Default)]
pub struct Collection {
    pub items: Vec<(SourceType, RawItem)>,
    pub statuses: Vec<SourceStatus>,
    pub warnings: Vec<Warning>,
}

/// Run all collectors concurrently and join them in the order given.
///
/// Items dated outside `options.range` are dropped. A source is `failed` when
/// its collector errors, panics, or reports errors without returning any item;
/// it is `partial` when it reports errors alongside items, in range or not.
pub async fn collect_all(collectors: &[Arc<dyn Collector>], options: CollectOptions) -> Collection {
    let handles: Vec<_> = collectors
        .iter()
        .map(|collector| {
            let collector = Arc::clone(collector);
            let source = collector.source();
            let handle = tokio::spawn(async move { collector.collect(&options).await });
            (source, handle)
        })
        .collect();

    let mut collection = Collection::default();
    for (source, handle) in handles {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join) => Err(anyhow::anyhow!("collector task aborted: {join}")),
        };

        match outcome {
            Ok(output) => {
                let fetched = output.items.len();
                let kept: Vec<RawItem> = output
                    .items
                    .into_iter()
                    .filter(|item| options.range.contains(item.date))
                    .collect();
                let status = if output.errors.is_empty() {
                    CollectionState::Success
                } else if fetched > 0 {
                    CollectionState::Partial
                } else {
                    CollectionState::Failed
                };
                let error = (!output.errors.is_empty()).then(|| output.errors.join("; "));
                if let Some(err) = &error {
                    tracing::warn!(%source, status = ?status, error = %err, "collector reported errors");
                    collection.warnings.push(Warning::new(
                        WarningKind::CollectorFailure,
                        format!("{source}: {err}"),
                    ));
                }
                tracing::debug!(%source, fetched, kept = kept.len(), "collected");
                collection.statuses.push(SourceStatus {
                    source,
                    status,
                    item_count: kept.len(),
                    error,
                });
                collection
                    .items
                    .extend(kept.into_iter().map(|item| (source, item)));
            }
            Err(e) => {
                tracing::warn!(%source, error = %format!("{e:#}"), "collector failed");
                collection.warnings.push(Warning::new(
                    WarningKind::CollectorFailure,
                    format!("{source}: {e:#}"),
                ));
                collection.statuses.push(SourceStatus {
                    source,
                    status: CollectionState::Failed,
                    item_count: 0,
                    error: Some(format!("{e:#}")),
                });
            }
        }
    }
    collection
}
