use cadence_core::{DateRange, Fidelity, SummaryDocument};

/// Merge finer-fidelity documents into one document for `(fidelity, period)`.
///
/// Buckets are concatenated in the order of `sources` and stats are
/// recomputed from the result. Items repeated across sources are kept, so a
/// TODO linked in two source periods counts twice.
pub fn distill(
    fidelity: Fidelity,
    period: &str,
    range: DateRange,
    sources: &[SummaryDocument],
    generated_at: String,
) -> SummaryDocument {
    let mut doc = SummaryDocument::new(fidelity, period, range, generated_at);
    for source in sources {
        doc.engineering.extend(source.engineering.iter().cloned());
        doc.management.extend(source.management.iter().cloned());
        doc.business.extend(source.business.iter().cloned());
        doc.source_summaries.push(source.id.clone());
    }
    doc.refresh_stats();
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::period::{parse_date, parse_period};
    use cadence_core::{Category, Priority, SourceRef, SourceType, SummaryItem, TodoLink};

    fn item(title: &str, category: Category, todo: Option<(&str, &str)>) -> SummaryItem {
        SummaryItem {
            id: title.to_lowercase().replace(' ', "-"),
            title: title.into(),
            description: None,
            category,
            priority: Priority::P2,
            date: parse_date("2025-01-14").unwrap(),
            sources: vec![SourceRef {
                source_type: SourceType::Linear,
                url: None,
                title: None,
            }],
            todo: todo.map(|(id, status)| TodoLink {
                id: id.into(),
                status: status.into(),
            }),
            action_item: false,
            summary: None,
        }
    }

    fn daily(period: &str, items: Vec<SummaryItem>) -> SummaryDocument {
        let range = parse_period(Fidelity::Daily, period).unwrap();
        let mut doc = SummaryDocument::new(Fidelity::Daily, period, range, "t".into());
        for i in items {
            doc.push(i);
        }
        doc.refresh_stats();
        doc
    }

    #[test]
    fn sums_items_across_sources() {
        let a = daily(
            "2025-01-13",
            vec![
                item("A1", Category::Engineering, None),
                item("A2", Category::Engineering, None),
                item("A3", Category::Business, None),
            ],
        );
        let b = daily(
            "2025-01-14",
            vec![
                item("B1", Category::Engineering, None),
                item("B2", Category::Management, None),
                item("B3", Category::Management, None),
                item("B4", Category::Management, None),
                item("B5", Category::Business, None),
            ],
        );
        let range = parse_period(Fidelity::Weekly, "2025-W03").unwrap();
        let doc = distill(Fidelity::Weekly, "2025-W03", range, &[a, b], "t".into());

        assert_eq!(doc.id, "weekly-2025-W03");
        assert_eq!(doc.stats.total_items, 8);
        assert_eq!(doc.stats.by_category.engineering, 3);
        assert_eq!(doc.stats.by_category.management, 3);
        assert_eq!(doc.stats.by_category.business, 2);
        assert_eq!(doc.engineering[2].title, "B1");
        assert_eq!(
            doc.source_summaries,
            vec!["daily-2025-01-13", "daily-2025-01-14"]
        );
        assert!(doc.is_distilled());
        assert!(doc.collection_status.is_empty());
    }

    #[test]
    fn todo_spanning_periods_counts_twice() {
        let a = daily(
            "2025-01-13",
            vec![item("Hire SRE", Category::Management, Some(("todo-5", "pending")))],
        );
        let b = daily(
            "2025-01-14",
            vec![item("Hire SRE", Category::Management, Some(("todo-5", "done")))],
        );
        let range = parse_period(Fidelity::Weekly, "2025-W03").unwrap();
        let doc = distill(Fidelity::Weekly, "2025-W03", range, &[a, b], "t".into());

        assert_eq!(doc.stats.total_items, 2);
        assert_eq!(doc.todo_progress.created, 2);
        assert_eq!(doc.todo_progress.completed, 1);
        assert_eq!(doc.todo_progress.pending, 1);
        assert_eq!(doc.todo_progress.linked_todo_ids, vec!["todo-5"]);
    }

    #[test]
    fn empty_sources_give_empty_document() {
        let range = parse_period(Fidelity::Yearly, "2025").unwrap();
        let doc = distill(Fidelity::Yearly, "2025", range, &[], "t".into());
        assert_eq!(doc.stats.total_items, 0);
        assert!(doc.source_summaries.is_empty());
    }
}
