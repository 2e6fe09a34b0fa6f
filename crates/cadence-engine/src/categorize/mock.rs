use std::collections::HashMap;
use std::sync::Mutex;

use cadence_core::{Category, Priority, RecurringTheme};

use super::{CategorizeRequest, Categorizer, Classification};
use crate::error::CategorizeError;

/// Rule-based categorizer for testing.
///
/// Titles registered with [`classify`](Self::classify) get that
/// classification; everything else gets the default rule. Themes and
/// failures are canned. Every request and prompt is recorded.
pub struct MockCategorizer {
    default: Option<(Category, Priority)>,
    rules: Mutex<HashMap<String, (Category, Priority, bool)>>,
    categorize_error: Mutex<Option<CategorizeError>>,
    themes: Mutex<Result<Vec<RecurringTheme>, CategorizeError>>,
    batches: Mutex<Vec<Vec<CategorizeRequest>>>,
    prompts: Mutex<Vec<String>>,
}

impl Default for MockCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCategorizer {
    /// Classifies every item as management/P1 and finds no themes.
    pub fn new() -> Self {
        Self {
            default: Some((Category::Management, Priority::P1)),
            rules: Mutex::new(HashMap::new()),
            categorize_error: Mutex::new(None),
            themes: Mutex::new(Ok(Vec::new())),
            batches: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Only titles with an explicit rule are classified; the rest are omitted
    /// from the response.
    pub fn rules_only() -> Self {
        Self {
            default: None,
            ..Self::new()
        }
    }

    pub fn classify(&self, title: &str, category: Category, priority: Priority, action: bool) {
        self.rules
            .lock()
            .unwrap()
            .insert(title.to_string(), (category, priority, action));
    }

    pub fn fail_categorize(&self, error: CategorizeError) {
        *self.categorize_error.lock().unwrap() = Some(error);
    }

    pub fn set_themes(&self, themes: Vec<RecurringTheme>) {
        *self.themes.lock().unwrap() = Ok(themes);
    }

    pub fn fail_themes(&self, error: CategorizeError) {
        *self.themes.lock().unwrap() = Err(error);
    }

    /// Every batch passed to `categorize`, in call order.
    pub fn batches(&self) -> Vec<Vec<CategorizeRequest>> {
        self.batches.lock().unwrap().clone()
    }

    /// Every prompt passed to `extract_themes`, in call order.
    pub fn theme_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Categorizer for MockCategorizer {
    async fn categorize(
        &self,
        requests: &[CategorizeRequest],
    ) -> Result<Vec<Classification>, CategorizeError> {
        self.batches.lock().unwrap().push(requests.to_vec());
        if let Some(err) = self.categorize_error.lock().unwrap().clone() {
            return Err(err);
        }
        let rules = self.rules.lock().unwrap();
        Ok(requests
            .iter()
            .enumerate()
            .filter_map(|(index, request)| {
                let (category, priority, action) = match rules.get(&request.title) {
                    Some(rule) => *rule,
                    None => {
                        let (category, priority) = self.default?;
                        (category, priority, false)
                    }
                };
                Some(Classification {
                    index,
                    category,
                    priority,
                    is_action_item: action,
                    summary: None,
                })
            })
            .collect())
    }

    async fn extract_themes(&self, prompt: &str) -> Result<Vec<RecurringTheme>, CategorizeError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.themes.lock().unwrap().clone()
    }
}
