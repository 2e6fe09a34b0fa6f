use std::collections::HashMap;
use std::sync::Arc;

use cadence_core::hash::item_id;
use cadence_core::{
    Category, DateRange, Fidelity, Priority, RawItem, SourceRef, SourceType, SummaryDocument,
    SummaryItem,
};

use crate::categorize::{CategorizeRequest, Categorizer, Classification};
use crate::collect::{collect_all, CollectOptions, Collector};
use crate::report::{Warning, WarningKind};

/// Classification used when the categorizer gives no answer for an item.
pub const FALLBACK_CATEGORY: Category = Category::Engineering;
pub const FALLBACK_PRIORITY: Priority = Priority::P2;

/// Build a daily document straight from the collectors.
///
/// Collector and categorizer failures degrade the result and are returned as
/// warnings; this never fails.
pub async fn generate_direct(
    period: &str,
    range: DateRange,
    collectors: &[Arc<dyn Collector>],
    categorizer: &dyn Categorizer,
    generated_at: String,
) -> (SummaryDocument, Vec<Warning>) {
    let collection = collect_all(collectors, CollectOptions { range }).await;
    let mut warnings = collection.warnings;

    let requests: Vec<CategorizeRequest> = collection
        .items
        .iter()
        .map(|(source, item)| CategorizeRequest {
            source: *source,
            title: item.title.clone(),
            description: item.description.clone(),
        })
        .collect();

    let mut classified: HashMap<usize, Classification> = HashMap::new();
    if !requests.is_empty() {
        match categorizer.categorize(&requests).await {
            Ok(classifications) => {
                // First answer per in-range index wins.
                for c in classifications {
                    if c.index < requests.len() {
                        classified.entry(c.index).or_insert(c);
                    }
                }
                let missing = requests.len() - classified.len();
                if missing > 0 {
                    tracing::warn!(period, missing, "categorizer skipped items");
                    warnings.push(Warning::new(
                        WarningKind::CategorizationFailure,
                        format!(
                            "no classification for {missing} of {} items; using {}/{}",
                            requests.len(),
                            FALLBACK_CATEGORY,
                            FALLBACK_PRIORITY
                        ),
                    ));
                }
            }
            Err(e) => {
                tracing::warn!(period, error = %e, "categorization failed, using defaults");
                warnings.push(Warning::new(
                    WarningKind::CategorizationFailure,
                    format!("{e}; using {FALLBACK_CATEGORY}/{FALLBACK_PRIORITY} for all items"),
                ));
            }
        }
    }

    let mut doc = SummaryDocument::new(Fidelity::Daily, period, range, generated_at);
    for (index, (source, raw)) in collection.items.into_iter().enumerate() {
        doc.push(summary_item(source, raw, classified.remove(&index)));
    }
    doc.collection_status = collection.statuses;
    doc.refresh_stats();
    (doc, warnings)
}

fn summary_item(source: SourceType, raw: RawItem, class: Option<Classification>) -> SummaryItem {
    let (category, priority, action_item, summary) = match class {
        Some(c) => (c.category, c.priority, c.is_action_item, c.summary),
        None => (FALLBACK_CATEGORY, FALLBACK_PRIORITY, false, None),
    };
    SummaryItem {
        id: raw
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| item_id(source, &raw.title, raw.date)),
        title: raw.title,
        description: raw.description,
        category,
        priority,
        date: raw.date,
        sources: vec![SourceRef {
            source_type: source,
            url: raw.url,
            title: None,
        }],
        todo: raw.todo,
        action_item,
        summary,
    }
}
