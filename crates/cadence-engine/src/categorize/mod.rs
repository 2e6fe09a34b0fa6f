pub mod claude;
pub mod mock;

use cadence_core::{Category, Priority, RecurringTheme, SourceType};
use serde::{Deserialize, Serialize};

use crate::error::CategorizeError;

pub use claude::ClaudeCategorizer;
pub use mock::MockCategorizer;

/// One item to classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorizeRequest {
    pub source: SourceType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Classification for the request at `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub index: usize,
    pub category: Category,
    pub priority: Priority,
    pub is_action_item: bool,
    pub summary: Option<String>,
}

/// The LLM-backed classifier. Both calls may fail; callers fall back to a
/// default classification or an empty theme list.
#[async_trait::async_trait]
pub trait Categorizer: Send + Sync {
    /// Classify a batch in one request. Entries may be missing for some
    /// indices; callers treat those items as unclassified.
    async fn categorize(
        &self,
        requests: &[CategorizeRequest],
    ) -> Result<Vec<Classification>, CategorizeError>;

    /// Answer a free-text theme-extraction prompt.
    async fn extract_themes(&self, prompt: &str) -> Result<Vec<RecurringTheme>, CategorizeError>;
}

/// Categorizer for `kind: none`: every call is unavailable.
pub struct NoopCategorizer;

#[async_trait::async_trait]
impl Categorizer for NoopCategorizer {
    async fn categorize(
        &self,
        _requests: &[CategorizeRequest],
    ) -> Result<Vec<Classification>, CategorizeError> {
        Err(CategorizeError::Unavailable("categorization disabled".into()))
    }

    async fn extract_themes(&self, _prompt: &str) -> Result<Vec<RecurringTheme>, CategorizeError> {
        Err(CategorizeError::Unavailable("categorization disabled".into()))
    }
}

// ── Prompts ──

/// Prompt asking for one classification object per request, by index.
pub fn classification_prompt(requests: &[CategorizeRequest]) -> String {
    let mut prompt = String::from(
        "Classify each work item for an engineering director's summary.\n\
         For every item return an object with:\n\
         - \"index\": the item's index\n\
         - \"category\": \"engineering\", \"management\" or \"business\"\n\
         - \"priority\": \"P0\" (critical) to \"P3\" (low)\n\
         - \"isActionItem\": true if the director must act on it\n\
         - \"summary\": one short sentence\n\
         Respond with a JSON array only.\n\nItems:\n",
    );
    for (index, request) in requests.iter().enumerate() {
        prompt.push_str(&format!("[{index}] ({}) {}", request.source, request.title));
        if let Some(desc) = request.description.as_deref().filter(|d| !d.is_empty()) {
            prompt.push_str(&format!(" :: {}", truncate(desc, 300)));
        }
        prompt.push('\n');
    }
    prompt
}

/// Prompt asking which themes recur between this period and earlier ones.
pub fn theme_prompt(current: &[String], history: &[String]) -> String {
    let mut prompt = String::from(
        "Identify recurring themes in these work items.\n\
         Return a JSON array of objects with \"theme\" (short name), \"occurrences\" \
         (number of matching items across both lists), \"sources\" (matching item titles) \
         and \"firstSeen\" (true if the theme does not appear in the earlier periods).\n\
         Respond with a JSON array only.\n\nThis period:\n",
    );
    for title in current {
        prompt.push_str(&format!("- {title}\n"));
    }
    prompt.push_str("\nEarlier periods:\n");
    if history.is_empty() {
        prompt.push_str("(none)\n");
    }
    for title in history {
        prompt.push_str(&format!("- {title}\n"));
    }
    prompt
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

// ── Response parsing ──

/// Locate the JSON array in a model reply, ignoring code fences and prose.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClassification {
    index: usize,
    #[serde(default)]
    category: String,
    #[serde(default)]
    priority: String,
    #[serde(default, alias = "is_action_item", alias = "actionItem")]
    is_action_item: bool,
    #[serde(default)]
    summary: Option<String>,
}

/// Parse a classification reply for `count` requests.
///
/// Entries with an out-of-range index, a duplicate index, or an unknown
/// category or priority are dropped; the caller falls back for those items.
pub fn parse_classifications(
    text: &str,
    count: usize,
) -> Result<Vec<Classification>, CategorizeError> {
    let json = extract_json_array(text)
        .ok_or_else(|| CategorizeError::Malformed("no JSON array in response".into()))?;
    let wire: Vec<WireClassification> =
        serde_json::from_str(json).map_err(|e| CategorizeError::Malformed(e.to_string()))?;

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(wire.len());
    for w in wire {
        if w.index >= count || !seen.insert(w.index) {
            continue;
        }
        let (Some(category), Some(priority)) =
            (Category::parse(&w.category), Priority::parse(&w.priority))
        else {
            continue;
        };
        out.push(Classification {
            index: w.index,
            category,
            priority,
            is_action_item: w.is_action_item,
            summary: w.summary.filter(|s| !s.trim().is_empty()),
        });
    }
    Ok(out)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTheme {
    theme: String,
    #[serde(default)]
    occurrences: u32,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default, alias = "first_seen")]
    first_seen: bool,
}

/// Parse a theme-extraction reply. Blank theme names are dropped.
pub fn parse_themes(text: &str) -> Result<Vec<RecurringTheme>, CategorizeError> {
    let json = extract_json_array(text)
        .ok_or_else(|| CategorizeError::Malformed("no JSON array in response".into()))?;
    let wire: Vec<WireTheme> =
        serde_json::from_str(json).map_err(|e| CategorizeError::Malformed(e.to_string()))?;
    Ok(wire
        .into_iter()
        .filter(|w| !w.theme.trim().is_empty())
        .map(|w| RecurringTheme {
            theme: w.theme.trim().to_string(),
            occurrences: w.occurrences,
            sources: w.sources,
            first_seen: w.first_seen,
        })
        .collect())
}
