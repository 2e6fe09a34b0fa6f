use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use cadence_core::period::parse_period;
use cadence_core::{Fidelity, SummaryDocument};

use crate::paths::CadencePaths;
use crate::render::render_markdown;
use crate::write_atomic;

/// Persistence for summary documents, keyed by `(fidelity, period)`.
///
/// At most one document exists per key. `save` overwrites unconditionally;
/// `load` must return a document equal to the one given to `save`.
pub trait DocumentStore: Send + Sync {
    fn exists(&self, fidelity: Fidelity, period: &str) -> Result<bool>;

    fn load(&self, fidelity: Fidelity, period: &str) -> Result<Option<SummaryDocument>>;

    fn save(&self, doc: &SummaryDocument) -> Result<()>;

    /// Stored periods for a fidelity, sorted.
    fn list(&self, fidelity: Fidelity) -> Result<Vec<String>>;

    /// Where `save` will put the document, for stores that have one.
    fn location(&self, _fidelity: Fidelity, _period: &str) -> Option<String> {
        None
    }
}

// ── Filesystem ──

/// Stores `<period>.json` plus a rendered `<period>.md` per document under
/// `.cadence/summaries/<fidelity>/`.
pub struct FsDocumentStore {
    paths: CadencePaths,
}

impl FsDocumentStore {
    pub fn new(paths: CadencePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &CadencePaths {
        &self.paths
    }
}

impl DocumentStore for FsDocumentStore {
    fn exists(&self, fidelity: Fidelity, period: &str) -> Result<bool> {
        parse_period(fidelity, period)?;
        Ok(self.paths.summary_json(fidelity, period).is_file())
    }

    fn load(&self, fidelity: Fidelity, period: &str) -> Result<Option<SummaryDocument>> {
        parse_period(fidelity, period)?;
        let path = self.paths.summary_json(fidelity, period);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading summary: {}", path.display()))?;
        let doc: SummaryDocument = serde_json::from_str(&content)
            .with_context(|| format!("parsing summary: {}", path.display()))?;
        Ok(Some(doc))
    }

    fn save(&self, doc: &SummaryDocument) -> Result<()> {
        parse_period(doc.fidelity, &doc.period)?;
        let json_path = self.paths.summary_json(doc.fidelity, &doc.period);
        let data = serde_json::to_string_pretty(doc)?;
        write_atomic(&json_path, data.as_bytes())
            .with_context(|| format!("saving summary: {}", json_path.display()))?;

        let md_path = self.paths.summary_md(doc.fidelity, &doc.period);
        write_atomic(&md_path, render_markdown(doc).as_bytes())
            .with_context(|| format!("saving narrative: {}", md_path.display()))?;

        tracing::debug!(id = %doc.id, path = %json_path.display(), "summary saved");
        Ok(())
    }

    fn list(&self, fidelity: Fidelity) -> Result<Vec<String>> {
        let dir = self.paths.fidelity_dir(fidelity);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut periods = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(period) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if parse_period(fidelity, period).is_ok() {
                periods.push(period.to_string());
            }
        }
        periods.sort();
        Ok(periods)
    }

    fn location(&self, fidelity: Fidelity, period: &str) -> Option<String> {
        Some(
            self.paths
                .summary_json(fidelity, period)
                .to_string_lossy()
                .into_owned(),
        )
    }
}

// ── In-memory ──

/// In-memory store for tests and dry runs. Records every save in order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<BTreeMap<(Fidelity, String), SummaryDocument>>,
    saves: Mutex<Vec<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without recording it as a save.
    pub fn insert(&self, doc: SummaryDocument) {
        self.docs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((doc.fidelity, doc.period.clone()), doc);
    }

    /// Ids of saved documents, in save order.
    pub fn saves(&self) -> Vec<String> {
        self.saves
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn exists(&self, fidelity: Fidelity, period: &str) -> Result<bool> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.contains_key(&(fidelity, period.to_string())))
    }

    fn load(&self, fidelity: Fidelity, period: &str) -> Result<Option<SummaryDocument>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.get(&(fidelity, period.to_string())).cloned())
    }

    fn save(&self, doc: &SummaryDocument) -> Result<()> {
        self.insert(doc.clone());
        self.saves
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(doc.id.clone());
        Ok(())
    }

    fn list(&self, fidelity: Fidelity) -> Result<Vec<String>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs
            .keys()
            .filter(|(f, _)| *f == fidelity)
            .map(|(_, p)| p.clone())
            .collect())
    }
}
