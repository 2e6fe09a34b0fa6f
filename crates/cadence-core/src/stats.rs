use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Category, Priority, SourceType, SummaryItem};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub engineering: usize,
    pub management: usize,
    pub business: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Engineering => self.engineering,
            Category::Management => self.management,
            Category::Business => self.business,
        }
    }

    fn bump(&mut self, category: Category) {
        match category {
            Category::Engineering => self.engineering += 1,
            Category::Management => self.management += 1,
            Category::Business => self.business += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    #[serde(rename = "P0")]
    pub p0: usize,
    #[serde(rename = "P1")]
    pub p1: usize,
    #[serde(rename = "P2")]
    pub p2: usize,
    #[serde(rename = "P3")]
    pub p3: usize,
}

impl PriorityCounts {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::P0 => self.p0,
            Priority::P1 => self.p1,
            Priority::P2 => self.p2,
            Priority::P3 => self.p3,
        }
    }

    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::P0 => self.p0 += 1,
            Priority::P1 => self.p1 += 1,
            Priority::P2 => self.p2 += 1,
            Priority::P3 => self.p3 += 1,
        }
    }
}

/// Aggregate counts over a document's items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_items: usize,
    pub by_category: CategoryCounts,
    pub by_priority: PriorityCounts,
    /// Every source reference counts, so an item seen in two places bumps both.
    pub by_source: BTreeMap<SourceType, usize>,
    pub action_items: usize,
}

impl SummaryStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a SummaryItem>) -> Self {
        let mut stats = Self::default();
        for item in items {
            stats.total_items += 1;
            stats.by_category.bump(item.category);
            stats.by_priority.bump(item.priority);
            for source in &item.sources {
                *stats.by_source.entry(source.source_type).or_insert(0) += 1;
            }
            if item.action_item {
                stats.action_items += 1;
            }
        }
        stats
    }
}

/// TODO movement over a document's items.
///
/// Counts are per item, not per TODO: a TODO that shows up in two source
/// summaries is counted twice once they are distilled together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoProgress {
    pub created: usize,
    pub completed: usize,
    pub pending: usize,
    /// Distinct linked TODO ids, in first-seen order.
    #[serde(default)]
    pub linked_todo_ids: Vec<String>,
}

impl TodoProgress {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a SummaryItem>) -> Self {
        let mut progress = Self::default();
        for todo in items.into_iter().filter_map(|i| i.todo.as_ref()) {
            progress.created += 1;
            if todo.is_completed() {
                progress.completed += 1;
            } else {
                progress.pending += 1;
            }
            if !progress.linked_todo_ids.contains(&todo.id) {
                progress.linked_todo_ids.push(todo.id.clone());
            }
        }
        progress
    }
}
