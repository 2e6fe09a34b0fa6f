use cadence_core::{
    DeliveryTrend, IncidentTrend, RecurringTheme, SeverityHistogram, SourceType, SummaryDocument,
    SummaryItem, TrendAnalysis, TrendDirection,
};

use crate::categorize::{theme_prompt, Categorizer};
use crate::config::TrendConfig;
use crate::report::{Warning, WarningKind};

/// Compare `doc` against earlier periods of the same fidelity.
///
/// `history` holds the documents of up to `history_window` preceding
/// periods, most recent first; `previous` is the immediately preceding one
/// when it exists. Missing history means zero baselines. A failed theme
/// extraction yields no themes and a warning.
pub async fn analyze_trends(
    doc: &SummaryDocument,
    previous: Option<&SummaryDocument>,
    history: &[SummaryDocument],
    categorizer: &dyn Categorizer,
    config: &TrendConfig,
) -> (TrendAnalysis, Option<Warning>) {
    let incidents = incident_trend(doc, previous, config);
    let delivery = delivery_trend(doc, previous);

    let (recurring_themes, warning) = match recurring_themes(doc, history, categorizer).await {
        Ok(themes) => (themes, None),
        Err(message) => {
            tracing::warn!(id = %doc.id, error = %message, "theme extraction failed");
            (
                Vec::new(),
                Some(Warning::new(
                    WarningKind::ThemeExtractionFailure,
                    format!("{}: {message}", doc.id),
                )),
            )
        }
    };

    let recommendations = recommendations(&incidents, &delivery, &recurring_themes, config);
    let analysis = TrendAnalysis {
        compared_to: previous.map(|p| p.period.clone()),
        incidents,
        delivery,
        recurring_themes,
        recommendations,
    };
    (analysis, warning)
}

/// Items from the incident tracker, or mentioning an incident.
pub fn is_incident(item: &SummaryItem) -> bool {
    item.has_source(SourceType::Incidents)
        || mentions(&item.title, "incident")
        || item
            .sources
            .iter()
            .filter_map(|s| s.title.as_deref())
            .any(|t| mentions(t, "incident"))
}

/// Items from code hosting, or titled as a pull request.
pub fn is_delivery(item: &SummaryItem) -> bool {
    if item.has_source(SourceType::Github) {
        return true;
    }
    let title = item.title.to_lowercase();
    title.contains("pull request")
        || title
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word == "pr" || word == "prs")
}

fn mentions(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(needle)
}

fn classify(count: usize, previous: usize, config: &TrendConfig) -> TrendDirection {
    let (count, previous) = (count as f64, previous as f64);
    if count > previous * config.increase_factor {
        TrendDirection::Increasing
    } else if count < previous * config.decrease_factor {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

pub fn incident_trend(
    doc: &SummaryDocument,
    previous: Option<&SummaryDocument>,
    config: &TrendConfig,
) -> IncidentTrend {
    let mut by_severity = SeverityHistogram::default();
    let mut count = 0;
    for item in doc.items().filter(|i| is_incident(i)) {
        count += 1;
        by_severity.record(item.priority.severity());
    }
    let previous_count = previous.map_or(0, |p| p.items().filter(|i| is_incident(i)).count());
    IncidentTrend {
        count,
        previous_count,
        trend: classify(count, previous_count, config),
        by_severity,
    }
}

pub fn delivery_trend(doc: &SummaryDocument, previous: Option<&SummaryDocument>) -> DeliveryTrend {
    DeliveryTrend {
        count: doc.items().filter(|i| is_delivery(i)).count(),
        previous_count: previous.map_or(0, |p| p.items().filter(|i| is_delivery(i)).count()),
    }
}

async fn recurring_themes(
    doc: &SummaryDocument,
    history: &[SummaryDocument],
    categorizer: &dyn Categorizer,
) -> Result<Vec<RecurringTheme>, String> {
    let current: Vec<String> = doc.items().map(|i| i.title.clone()).collect();
    let earlier: Vec<String> = history
        .iter()
        .filter(|h| h.id != doc.id)
        .flat_map(|h| h.items().map(|i| i.title.clone()))
        .collect();
    if current.is_empty() {
        return Ok(Vec::new());
    }
    categorizer
        .extract_themes(&theme_prompt(&current, &earlier))
        .await
        .map_err(|e| e.to_string())
}

/// Fixed rules over the computed trends, in a stable order.
pub fn recommendations(
    incidents: &IncidentTrend,
    delivery: &DeliveryTrend,
    themes: &[RecurringTheme],
    config: &TrendConfig,
) -> Vec<String> {
    let mut out = Vec::new();
    if incidents.trend == TrendDirection::Increasing {
        out.push(format!(
            "Incidents rose to {} from {}. Schedule a stability review.",
            incidents.count, incidents.previous_count
        ));
    }
    if incidents.by_severity.critical > 0 {
        out.push(format!(
            "{} critical incident(s) this period. Run an incident-response review.",
            incidents.by_severity.critical
        ));
    }
    if (delivery.count as f64) < delivery.previous_count as f64 * config.velocity_drop_factor {
        out.push(format!(
            "Delivery dropped to {} from {}. Check team velocity and blockers.",
            delivery.count, delivery.previous_count
        ));
    }
    for theme in themes
        .iter()
        .filter(|t| t.occurrences >= config.recurring_theme_min)
    {
        out.push(format!(
            "\"{}\" came up {} times. Give it dedicated attention.",
            theme.theme, theme.occurrences
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::MockCategorizer;
    use crate::error::CategorizeError;
    use cadence_core::period::{parse_date, parse_period};
    use cadence_core::{Category, Fidelity, Priority, SourceRef};

    fn item(title: &str, source: SourceType, priority: Priority) -> SummaryItem {
        SummaryItem {
            id: title.into(),
            title: title.into(),
            description: None,
            category: Category::Engineering,
            priority,
            date: parse_date("2025-01-14").unwrap(),
            sources: vec![SourceRef {
                source_type: source,
                url: None,
                title: None,
            }],
            todo: None,
            action_item: false,
            summary: None,
        }
    }

    fn weekly(period: &str, incidents: usize, deliveries: usize) -> SummaryDocument {
        let range = parse_period(Fidelity::Weekly, period).unwrap();
        let mut doc = SummaryDocument::new(Fidelity::Weekly, period, range, "t".into());
        for n in 0..incidents {
            doc.push(item(&format!("Outage {n}"), SourceType::Incidents, Priority::P2));
        }
        for n in 0..deliveries {
            doc.push(item(&format!("Merge PR #{n}"), SourceType::Linear, Priority::P3));
        }
        doc.refresh_stats();
        doc
    }

    #[test]
    fn incident_thresholds() {
        let config = TrendConfig::default();
        let prev = weekly("2025-W02", 10, 0);
        let cases = [
            (12, TrendDirection::Stable),
            (13, TrendDirection::Increasing),
            (7, TrendDirection::Decreasing),
            (8, TrendDirection::Stable),
        ];
        for (count, expected) in cases {
            let doc = weekly("2025-W03", count, 0);
            let trend = incident_trend(&doc, Some(&prev), &config);
            assert_eq!(trend.previous_count, 10);
            assert_eq!(trend.trend, expected, "count {count}");
        }
    }

    #[test]
    fn zero_baseline_without_previous() {
        let config = TrendConfig::default();
        let trend = incident_trend(&weekly("2025-W03", 0, 0), None, &config);
        assert_eq!(trend.trend, TrendDirection::Stable);
        let trend = incident_trend(&weekly("2025-W03", 1, 0), None, &config);
        assert_eq!(trend.previous_count, 0);
        assert_eq!(trend.trend, TrendDirection::Increasing);
    }

    #[test]
    fn incident_and_delivery_matching() {
        let mut by_title = item("Postmortem for incident 42", SourceType::Slack, Priority::P0);
        assert!(is_incident(&by_title));
        by_title.title = "Postmortem".into();
        by_title.sources[0].title = Some("INCIDENT-42 channel".into());
        assert!(is_incident(&by_title));
        assert!(!is_incident(&item("Weekly sync", SourceType::Slack, Priority::P2)));

        assert!(is_delivery(&item("Anything", SourceType::Github, Priority::P2)));
        assert!(is_delivery(&item("Review PR #8", SourceType::Slack, Priority::P2)));
        assert!(is_delivery(&item("3 PRs merged", SourceType::Slack, Priority::P2)));
        assert!(is_delivery(&item("Pull request backlog", SourceType::Email, Priority::P2)));
        assert!(!is_delivery(&item("Sprint process review", SourceType::Linear, Priority::P2)));
        assert!(!is_delivery(&item("New PRD draft", SourceType::Notion, Priority::P2)));
    }

    #[test]
    fn severity_histogram_follows_priority() {
        let range = parse_period(Fidelity::Weekly, "2025-W03").unwrap();
        let mut doc = SummaryDocument::new(Fidelity::Weekly, "2025-W03", range, "t".into());
        doc.push(item("db down", SourceType::Incidents, Priority::P0));
        doc.push(item("slow api", SourceType::Incidents, Priority::P1));
        doc.push(item("typo", SourceType::Incidents, Priority::P3));
        let trend = incident_trend(&doc, None, &TrendConfig::default());
        assert_eq!(trend.by_severity.critical, 1);
        assert_eq!(trend.by_severity.high, 1);
        assert_eq!(trend.by_severity.medium, 0);
        assert_eq!(trend.by_severity.low, 1);
    }

    #[test]
    fn recommendation_rules_in_order() {
        let config = TrendConfig::default();
        let incidents = IncidentTrend {
            count: 5,
            previous_count: 2,
            trend: TrendDirection::Increasing,
            by_severity: SeverityHistogram {
                critical: 2,
                ..Default::default()
            },
        };
        let delivery = DeliveryTrend {
            count: 6,
            previous_count: 10,
        };
        let themes = vec![
            RecurringTheme {
                theme: "Flaky CI".into(),
                occurrences: 3,
                sources: vec![],
                first_seen: false,
            },
            RecurringTheme {
                theme: "Hiring".into(),
                occurrences: 2,
                sources: vec![],
                first_seen: true,
            },
        ];
        let recs = recommendations(&incidents, &delivery, &themes, &config);
        assert_eq!(recs.len(), 4);
        assert!(recs[0].contains("stability review"));
        assert!(recs[1].starts_with("2 critical"));
        assert!(recs[2].contains("velocity"));
        assert!(recs[3].contains("Flaky CI"));

        let quiet = IncidentTrend {
            count: 0,
            previous_count: 0,
            trend: TrendDirection::Stable,
            by_severity: SeverityHistogram::default(),
        };
        let steady = DeliveryTrend {
            count: 8,
            previous_count: 10,
        };
        assert!(recommendations(&quiet, &steady, &[], &config).is_empty());
    }

    #[tokio::test]
    async fn analysis_uses_history_titles() {
        let categorizer = MockCategorizer::new();
        categorizer.set_themes(vec![RecurringTheme {
            theme: "Outages".into(),
            occurrences: 4,
            sources: vec!["Outage 0".into()],
            first_seen: false,
        }]);
        let prev = weekly("2025-W02", 1, 3);
        let older = weekly("2025-W01", 2, 0);
        let doc = weekly("2025-W03", 2, 1);
        let history = vec![prev.clone(), older];

        let (analysis, warning) = analyze_trends(
            &doc,
            Some(&prev),
            &history,
            &categorizer,
            &TrendConfig::default(),
        )
        .await;

        assert!(warning.is_none());
        assert_eq!(analysis.compared_to.as_deref(), Some("2025-W02"));
        assert_eq!(analysis.incidents.trend, TrendDirection::Increasing);
        assert_eq!(analysis.delivery.count, 1);
        assert_eq!(analysis.delivery.previous_count, 3);
        assert_eq!(analysis.recurring_themes.len(), 1);
        assert_eq!(analysis.recommendations.len(), 3);

        let prompts = categorizer.theme_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("This period:\n- Outage 0\n- Outage 1\n- Merge PR #0\n"));
        assert!(prompts[0].contains("Earlier periods:\n- Outage 0\n"));
    }

    #[tokio::test]
    async fn theme_failure_degrades_to_empty() {
        let categorizer = MockCategorizer::new();
        categorizer.fail_themes(CategorizeError::Malformed("prose".into()));
        let doc = weekly("2025-W03", 1, 0);

        let (analysis, warning) =
            analyze_trends(&doc, None, &[], &categorizer, &TrendConfig::default()).await;

        assert!(analysis.recurring_themes.is_empty());
        assert_eq!(analysis.compared_to, None);
        assert_eq!(warning.unwrap().kind, WarningKind::ThemeExtractionFailure);
    }
}
