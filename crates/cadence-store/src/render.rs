use cadence_core::{
    CollectionState, Priority, SummaryDocument, SummaryItem, TrendAnalysis, Category,
};

// ── Narrative markdown ──

/// Render the human-readable narrative for a summary document.
pub fn render_markdown(doc: &SummaryDocument) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# {} Summary: {}\n\n",
        doc.fidelity.label(),
        doc.period
    ));
    out.push_str(&format!(
        "_{} · generated {}_\n\n",
        doc.date_range, doc.generated_at
    ));

    write_overview(&mut out, doc);
    for category in Category::ALL {
        write_category(&mut out, category, doc.bucket(category));
    }
    write_todos(&mut out, doc);
    if let Some(trends) = &doc.trends {
        write_trends(&mut out, trends);
    }
    write_provenance(&mut out, doc);
    out
}

fn write_overview(out: &mut String, doc: &SummaryDocument) {
    let s = &doc.stats;
    out.push_str("## Overview\n\n");
    out.push_str(&format!(
        "- Items: {} (engineering {}, management {}, business {})\n",
        s.total_items,
        s.by_category.engineering,
        s.by_category.management,
        s.by_category.business
    ));
    let priorities: Vec<String> = Priority::ALL
        .iter()
        .map(|p| format!("{p} {}", s.by_priority.get(*p)))
        .collect();
    out.push_str(&format!("- Priority: {}\n", priorities.join(" · ")));
    out.push_str(&format!("- Action items: {}\n", s.action_items));
    if !s.by_source.is_empty() {
        let sources: Vec<String> = s
            .by_source
            .iter()
            .map(|(source, n)| format!("{source} {n}"))
            .collect();
        out.push_str(&format!("- Sources: {}\n", sources.join(", ")));
    }
    out.push('\n');
}

fn write_category(out: &mut String, category: Category, items: &[SummaryItem]) {
    let title = match category {
        Category::Engineering => "Engineering",
        Category::Management => "Management",
        Category::Business => "Business",
    };
    out.push_str(&format!("## {title}\n\n"));
    if items.is_empty() {
        out.push_str("(none)\n\n");
        return;
    }
    for priority in Priority::ALL {
        let group: Vec<&SummaryItem> = items.iter().filter(|i| i.priority == priority).collect();
        if group.is_empty() {
            continue;
        }
        out.push_str(&format!("### {priority}\n\n"));
        for item in group {
            out.push_str(&format!("- {}\n", item_line(item)));
        }
        out.push('\n');
    }
}

fn item_line(item: &SummaryItem) -> String {
    let mut line = format!("**{}**", item.title);
    if item.action_item {
        line.push_str(" [action]");
    }
    if let Some(text) = item.summary.as_deref().or(item.description.as_deref()) {
        if !text.is_empty() {
            line.push_str(&format!(" — {text}"));
        }
    }
    let refs: Vec<String> = item
        .sources
        .iter()
        .map(|s| match &s.url {
            Some(url) => format!("[{}]({url})", s.source_type),
            None => s.source_type.to_string(),
        })
        .collect();
    if !refs.is_empty() {
        line.push_str(&format!(" ({})", refs.join(", ")));
    }
    if let Some(todo) = &item.todo {
        line.push_str(&format!(" · todo {} {}", todo.id, todo.status));
    }
    line
}

fn write_todos(out: &mut String, doc: &SummaryDocument) {
    let t = &doc.todo_progress;
    if t.created == 0 {
        return;
    }
    out.push_str("## TODO Progress\n\n");
    out.push_str(&format!(
        "- Linked: {} · completed {} · pending {}\n",
        t.created, t.completed, t.pending
    ));
    out.push_str(&format!("- TODOs: {}\n\n", t.linked_todo_ids.join(", ")));
}

fn write_trends(out: &mut String, trends: &TrendAnalysis) {
    out.push_str("## Trends\n\n");
    if let Some(prev) = &trends.compared_to {
        out.push_str(&format!("Compared to {prev}.\n\n"));
    } else {
        out.push_str("No previous period on record.\n\n");
    }
    let i = &trends.incidents;
    out.push_str(&format!(
        "- Incidents: {} (previous {}, {}) · critical {} · high {} · medium {} · low {}\n",
        i.count,
        i.previous_count,
        i.trend,
        i.by_severity.critical,
        i.by_severity.high,
        i.by_severity.medium,
        i.by_severity.low
    ));
    out.push_str(&format!(
        "- Delivery: {} (previous {})\n",
        trends.delivery.count, trends.delivery.previous_count
    ));
    if !trends.recurring_themes.is_empty() {
        out.push_str("\n### Recurring themes\n\n");
        for theme in &trends.recurring_themes {
            let marker = if theme.first_seen { " (new)" } else { "" };
            out.push_str(&format!(
                "- {}{marker}: {} occurrences\n",
                theme.theme, theme.occurrences
            ));
        }
    }
    if !trends.recommendations.is_empty() {
        out.push_str("\n### Recommendations\n\n");
        for rec in &trends.recommendations {
            out.push_str(&format!("- {rec}\n"));
        }
    }
    out.push('\n');
}

fn write_provenance(out: &mut String, doc: &SummaryDocument) {
    if !doc.collection_status.is_empty() {
        out.push_str("## Collection Status\n\n");
        for status in &doc.collection_status {
            let state = match status.status {
                CollectionState::Success => "success",
                CollectionState::Partial => "partial",
                CollectionState::Failed => "failed",
            };
            out.push_str(&format!(
                "- {}: {state} ({} items)",
                status.source, status.item_count
            ));
            if let Some(err) = &status.error {
                out.push_str(&format!(" — {err}"));
            }
            out.push('\n');
        }
        out.push('\n');
    }
    if !doc.source_summaries.is_empty() {
        out.push_str("## Distilled From\n\n");
        for id in &doc.source_summaries {
            out.push_str(&format!("- {id}\n"));
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::period::{parse_date, parse_period};
    use cadence_core::{
        DeliveryTrend, Fidelity, IncidentTrend, SeverityHistogram, SourceRef, SourceStatus,
        SourceType, TodoLink, TrendDirection,
    };

    fn sample() -> SummaryDocument {
        let range = parse_period(Fidelity::Daily, "2025-01-15").unwrap();
        let mut doc = SummaryDocument::new(Fidelity::Daily, "2025-01-15", range, "now".into());
        doc.push(SummaryItem {
            id: "1".into(),
            title: "Fix login outage".into(),
            description: Some("root cause in session cache".into()),
            category: Category::Engineering,
            priority: Priority::P0,
            date: parse_date("2025-01-15").unwrap(),
            sources: vec![SourceRef {
                source_type: SourceType::Incidents,
                url: Some("https://status.test/1".into()),
                title: None,
            }],
            todo: Some(TodoLink {
                id: "todo-9".into(),
                status: "pending".into(),
            }),
            action_item: true,
            summary: None,
        });
        doc.collection_status.push(SourceStatus {
            source: SourceType::Slack,
            status: CollectionState::Failed,
            item_count: 0,
            error: Some("token expired".into()),
        });
        doc.refresh_stats();
        doc
    }

    #[test]
    fn renders_sections() {
        let md = render_markdown(&sample());
        assert!(md.starts_with("# Daily Summary: 2025-01-15\n"));
        assert!(md.contains("- Items: 1 (engineering 1, management 0, business 0)"));
        assert!(md.contains("### P0"));
        assert!(md.contains("**Fix login outage** [action] — root cause in session cache"));
        assert!(md.contains("[incidents](https://status.test/1)"));
        assert!(md.contains("## TODO Progress"));
        assert!(md.contains("- slack: failed (0 items) — token expired"));
        assert!(md.contains("## Management\n\n(none)"));
        assert!(!md.contains("## Trends"));
    }

    #[test]
    fn renders_trends_and_provenance() {
        let mut doc = sample();
        doc.source_summaries = vec!["daily-2025-01-14".into()];
        doc.trends = Some(TrendAnalysis {
            compared_to: Some("2025-W02".into()),
            incidents: IncidentTrend {
                count: 3,
                previous_count: 1,
                trend: TrendDirection::Increasing,
                by_severity: SeverityHistogram {
                    critical: 1,
                    ..Default::default()
                },
            },
            delivery: DeliveryTrend {
                count: 4,
                previous_count: 9,
            },
            recurring_themes: vec![],
            recommendations: vec!["Review stability.".into()],
        });
        let md = render_markdown(&doc);
        assert!(md.contains("Compared to 2025-W02."));
        assert!(md.contains("- Incidents: 3 (previous 1, increasing) · critical 1"));
        assert!(md.contains("- Delivery: 4 (previous 9)"));
        assert!(md.contains("### Recommendations\n\n- Review stability."));
        assert!(md.contains("## Distilled From\n\n- daily-2025-01-14"));
    }
}
