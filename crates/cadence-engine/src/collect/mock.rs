use std::sync::atomic::{AtomicUsize, Ordering};

use cadence_core::{RawItem, SourceType};

use super::{CollectOptions, Collector, CollectorOutput};

enum Behavior {
    Items,
    Fail(String),
    Panic,
}

/// Collector returning canned items (for testing). Counts its calls.
pub struct MockCollector {
    source: SourceType,
    items: Vec<RawItem>,
    errors: Vec<String>,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockCollector {
    pub fn new(source: SourceType) -> Self {
        Self {
            source,
            items: Vec::new(),
            errors: Vec::new(),
            behavior: Behavior::Items,
            calls: AtomicUsize::new(0),
        }
    }

    /// A collector whose `collect` returns `Err(message)`.
    pub fn failing(source: SourceType, message: &str) -> Self {
        Self {
            behavior: Behavior::Fail(message.to_string()),
            ..Self::new(source)
        }
    }

    /// A collector whose `collect` panics.
    pub fn panicking(source: SourceType) -> Self {
        Self {
            behavior: Behavior::Panic,
            ..Self::new(source)
        }
    }

    pub fn with_items(mut self, items: Vec<RawItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Collector for MockCollector {
    fn source(&self) -> SourceType {
        self.source
    }

    async fn collect(&self, _options: &CollectOptions) -> anyhow::Result<CollectorOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Items => Ok(CollectorOutput {
                items: self.items.clone(),
                errors: self.errors.clone(),
            }),
            Behavior::Fail(message) => Err(anyhow::anyhow!("{message}")),
            Behavior::Panic => panic!("mock collector for {} panicked", self.source),
        }
    }
}
