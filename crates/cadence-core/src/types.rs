use std::fmt;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::period::{iso_date, DateRange, Fidelity};
use crate::stats::{SummaryStats, TodoProgress};

/// Current schema version for persisted summary documents.
pub const SCHEMA_VERSION: u32 = 1;

/// Document identity key: `{fidelity}-{period}`, e.g. `weekly-2025-W03`.
pub type DocumentId = String;

pub fn document_id(fidelity: Fidelity, period: &str) -> DocumentId {
    format!("{fidelity}-{period}")
}

// ── Classification ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Engineering,
    Management,
    Business,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Engineering,
        Category::Management,
        Category::Business,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Engineering => "engineering",
            Category::Management => "management",
            Category::Business => "business",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "engineering" => Some(Category::Engineering),
            "management" => Some(Category::Management),
            "business" => Some(Category::Business),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::P0, Priority::P1, Priority::P2, Priority::P3];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P0" => Some(Priority::P0),
            "P1" => Some(Priority::P1),
            "P2" => Some(Priority::P2),
            "P3" => Some(Priority::P3),
            _ => None,
        }
    }

    /// Incident severity label for this priority.
    pub fn severity(self) -> Severity {
        match self {
            Priority::P0 => Severity::Critical,
            Priority::P1 => Severity::High,
            Priority::P2 => Severity::Medium,
            Priority::P3 => Severity::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

// ── Sources ──

/// The external collaborator a work item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Code hosting: pull requests, reviews, releases.
    Github,
    /// Issue tracker.
    Linear,
    Slack,
    Email,
    /// Documents and RFCs.
    Notion,
    Incidents,
    Todos,
    Calendar,
    #[serde(other)]
    Other,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Github => "github",
            SourceType::Linear => "linear",
            SourceType::Slack => "slack",
            SourceType::Email => "email",
            SourceType::Notion => "notion",
            SourceType::Incidents => "incidents",
            SourceType::Todos => "todos",
            SourceType::Calendar => "calendar",
            SourceType::Other => "other",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an item was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Link to an item in the external TODO store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoLink {
    pub id: String,
    pub status: String,
}

impl TodoLink {
    pub fn is_completed(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "completed" | "done" | "closed"
        )
    }
}

// ── Items ──

/// A raw, unclassified work item as supplied by a collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<TodoLink>,
}

/// One classified unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<TodoLink>,
    #[serde(default)]
    pub action_item: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl SummaryItem {
    pub fn has_source(&self, source: SourceType) -> bool {
        self.sources.iter().any(|s| s.source_type == source)
    }
}

// ── Collection status ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    Success,
    Partial,
    Failed,
}

/// Outcome of one collector during direct generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source: SourceType,
    pub status: CollectionState,
    /// Items kept after date-range filtering.
    pub item_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Trends ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Stable => "stable",
            TrendDirection::Decreasing => "decreasing",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityHistogram {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityHistogram {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentTrend {
    pub count: usize,
    pub previous_count: usize,
    pub trend: TrendDirection,
    pub by_severity: SeverityHistogram,
}

/// Delivery volume vs. the previous period. Raw counts only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTrend {
    pub count: usize,
    pub previous_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTheme {
    pub theme: String,
    pub occurrences: u32,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub first_seen: bool,
}

/// Period-over-period comparison attached to non-daily documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    /// Period compared against, when its document was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compared_to: Option<String>,
    pub incidents: IncidentTrend,
    pub delivery: DeliveryTrend,
    #[serde(default)]
    pub recurring_themes: Vec<RecurringTheme>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

// ── Documents ──

/// The summary for one `(fidelity, period)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub id: DocumentId,
    pub fidelity: Fidelity,
    pub period: String,
    pub date_range: DateRange,
    pub generated_at: String,
    #[serde(default)]
    pub engineering: Vec<SummaryItem>,
    #[serde(default)]
    pub management: Vec<SummaryItem>,
    #[serde(default)]
    pub business: Vec<SummaryItem>,
    pub stats: SummaryStats,
    pub todo_progress: TodoProgress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendAnalysis>,
    /// Ids of the documents this one was distilled from. Empty for daily.
    #[serde(default)]
    pub source_summaries: Vec<DocumentId>,
    #[serde(default)]
    pub collection_status: Vec<SourceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub schema_version: u32,
}

impl SummaryDocument {
    /// Empty document for `(fidelity, period)`; items are added with [`push`](Self::push).
    pub fn new(fidelity: Fidelity, period: &str, date_range: DateRange, generated_at: String) -> Self {
        Self {
            id: document_id(fidelity, period),
            fidelity,
            period: period.to_string(),
            date_range,
            generated_at,
            engineering: Vec::new(),
            management: Vec::new(),
            business: Vec::new(),
            stats: SummaryStats::default(),
            todo_progress: TodoProgress::default(),
            trends: None,
            source_summaries: Vec::new(),
            collection_status: Vec::new(),
            file_path: None,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Route an item into its category bucket.
    pub fn push(&mut self, item: SummaryItem) {
        match item.category {
            Category::Engineering => self.engineering.push(item),
            Category::Management => self.management.push(item),
            Category::Business => self.business.push(item),
        }
    }

    pub fn bucket(&self, category: Category) -> &[SummaryItem] {
        match category {
            Category::Engineering => &self.engineering,
            Category::Management => &self.management,
            Category::Business => &self.business,
        }
    }

    /// All items, engineering first, then management, then business.
    pub fn items(&self) -> impl Iterator<Item = &SummaryItem> {
        self.engineering
            .iter()
            .chain(self.management.iter())
            .chain(self.business.iter())
    }

    /// Recompute `stats` and `todo_progress` from the current buckets.
    pub fn refresh_stats(&mut self) {
        self.stats = SummaryStats::from_items(self.items());
        self.todo_progress = TodoProgress::from_items(self.items());
    }

    pub fn is_distilled(&self) -> bool {
        !self.source_summaries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{parse_date, parse_period};

    fn item(title: &str, category: Category) -> SummaryItem {
        SummaryItem {
            id: title.to_lowercase(),
            title: title.into(),
            description: None,
            category,
            priority: Priority::P2,
            date: parse_date("2025-01-15").unwrap(),
            sources: vec![SourceRef {
                source_type: SourceType::Github,
                url: None,
                title: None,
            }],
            todo: None,
            action_item: false,
            summary: None,
        }
    }

    #[test]
    fn push_routes_by_category() {
        let range = parse_period(Fidelity::Daily, "2025-01-15").unwrap();
        let mut doc = SummaryDocument::new(Fidelity::Daily, "2025-01-15", range, "t".into());
        doc.push(item("A", Category::Business));
        doc.push(item("B", Category::Engineering));
        doc.push(item("C", Category::Management));
        assert_eq!(doc.id, "daily-2025-01-15");
        assert_eq!(doc.bucket(Category::Business).len(), 1);
        let titles: Vec<&str> = doc.items().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "C", "A"]);
    }

    #[test]
    fn document_json_roundtrip() {
        let range = parse_period(Fidelity::Weekly, "2025-W03").unwrap();
        let mut doc = SummaryDocument::new(Fidelity::Weekly, "2025-W03", range, "t".into());
        doc.push(item("Ship release", Category::Engineering));
        doc.source_summaries = vec!["daily-2025-01-13".into()];
        doc.refresh_stats();

        let json = serde_json::to_string_pretty(&doc).unwrap();
        assert!(json.contains("\"fidelity\": \"weekly\""));
        assert!(json.contains("\"date\": \"2025-01-15\""));
        let back: SummaryDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert!(back.is_distilled());
    }

    #[test]
    fn unknown_source_type_maps_to_other() {
        let s: SourceRef = serde_json::from_str(r#"{"type":"jira"}"#).unwrap();
        assert_eq!(s.source_type, SourceType::Other);
    }

    #[test]
    fn todo_completion_statuses() {
        let done = TodoLink { id: "t1".into(), status: "Done".into() };
        let open = TodoLink { id: "t2".into(), status: "in_progress".into() };
        assert!(done.is_completed());
        assert!(!open.is_completed());
    }

    #[test]
    fn priority_maps_to_severity() {
        assert_eq!(Priority::P0.severity(), Severity::Critical);
        assert_eq!(Priority::P3.severity(), Severity::Low);
        assert_eq!(Priority::parse("p1"), Some(Priority::P1));
        assert_eq!(Category::parse("Business"), Some(Category::Business));
    }
}
