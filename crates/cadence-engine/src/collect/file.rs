use std::path::PathBuf;

use anyhow::Context;
use cadence_core::{RawItem, SourceType};

use super::{CollectOptions, Collector, CollectorOutput};

/// Reads one source's JSONL export: one [`RawItem`] per line.
///
/// Every parsed item is returned whatever its date; range filtering happens in
/// [`super::collect_all`]. A missing or unreadable file fails the source. Lines
/// that do not parse are reported as errors and skipped.
pub struct FileCollector {
    source: SourceType,
    path: PathBuf,
}

impl FileCollector {
    pub fn new(source: SourceType, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            path: path.into(),
        }
    }
}

#[async_trait::async_trait]
impl Collector for FileCollector {
    fn source(&self) -> SourceType {
        self.source
    }

    async fn collect(&self, _options: &CollectOptions) -> anyhow::Result<CollectorOutput> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading export {}", self.path.display()))?;

        let mut output = CollectorOutput::default();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match serde_json::from_str::<RawItem>(line) {
                Ok(item) => output.items.push(item),
                Err(e) => output.errors.push(format!("line {}: {e}", n + 1)),
            }
        }
        tracing::debug!(
            source = %self.source,
            path = %self.path.display(),
            items = output.items.len(),
            errors = output.errors.len(),
            "read export"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::collect::collect_all;
    use cadence_core::period::parse_period;
    use cadence_core::{CollectionState, Fidelity};

    fn options(week: &str) -> CollectOptions {
        CollectOptions {
            range: parse_period(Fidelity::Weekly, week).unwrap(),
        }
    }

    #[tokio::test]
    async fn reads_every_parsed_item() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("github.jsonl");
        std::fs::write(
            &path,
            concat!(
                "{\"title\":\"Merge PR #4\",\"date\":\"2025-01-14\",\"url\":\"https://gh.test/4\"}\n",
                "\n",
                "# exported 2025-01-20\n",
                "{\"title\":\"Merge PR #1\",\"date\":\"2025-01-02\"}\n",
                "{\"id\":\"t-1\",\"title\":\"Ship importer\",\"date\":\"2025-01-16\",",
                "\"todo\":{\"id\":\"todo-3\",\"status\":\"done\"}}\n",
            ),
        )
        .unwrap();

        let collector = FileCollector::new(SourceType::Github, &path);
        let out = collector.collect(&options("2025-W03")).await.unwrap();
        assert!(out.errors.is_empty());
        assert_eq!(out.items.len(), 3);
        assert_eq!(out.items[0].url.as_deref(), Some("https://gh.test/4"));
        assert_eq!(out.items[1].title, "Merge PR #1");
        assert_eq!(out.items[2].id.as_deref(), Some("t-1"));
        assert!(out.items[2].todo.as_ref().unwrap().is_completed());
    }

    #[tokio::test]
    async fn malformed_lines_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("slack.jsonl");
        std::fs::write(
            &path,
            "{\"title\":\"Standup notes\",\"date\":\"2025-01-15\"}\n{\"title\":\"no date\"}\nnot json\n",
        )
        .unwrap();

        let out = FileCollector::new(SourceType::Slack, &path)
            .collect(&options("2025-W03"))
            .await
            .unwrap();
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.errors.len(), 2);
        assert!(out.errors[0].starts_with("line 2:"));
    }

    #[tokio::test]
    async fn quiet_day_with_damaged_export_is_partial() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("linear.jsonl");
        std::fs::write(
            &path,
            "{\"title\":\"Close ENG-9\",\"date\":\"2025-01-14\"}\nnot json\n",
        )
        .unwrap();

        let collectors: Vec<Arc<dyn Collector>> =
            vec![Arc::new(FileCollector::new(SourceType::Linear, &path))];
        let range = parse_period(Fidelity::Daily, "2025-01-16").unwrap();
        let c = collect_all(&collectors, CollectOptions { range }).await;

        assert!(c.items.is_empty());
        assert_eq!(c.statuses[0].status, CollectionState::Partial);
        assert_eq!(c.statuses[0].item_count, 0);
        assert!(c.statuses[0].error.as_deref().unwrap().starts_with("line 2:"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let collector = FileCollector::new(SourceType::Email, tmp.path().join("nope.jsonl"));
        let err = collector.collect(&options("2025-W03")).await.unwrap_err();
        assert!(format!("{err:#}").contains("nope.jsonl"));
    }
}
