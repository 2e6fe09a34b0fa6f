use std::path::{Path, PathBuf};

use cadence_core::Fidelity;

/// All well-known paths under `.cadence/`.
#[derive(Debug, Clone)]
pub struct CadencePaths {
    pub root: PathBuf,
    pub cadence_dir: PathBuf,
    pub summaries_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub config_yaml: PathBuf,
    pub lock_file: PathBuf,
}

impl CadencePaths {
    /// Derive all paths from a workspace root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cadence_dir = root.join(".cadence");
        Self {
            summaries_dir: cadence_dir.join("summaries"),
            exports_dir: cadence_dir.join("exports"),
            config_yaml: cadence_dir.join("config.yaml"),
            lock_file: cadence_dir.join("LOCK"),
            cadence_dir,
            root,
        }
    }

    /// Per-user fallback root: `<data_dir>/cadence`, or `~/.cadence-home`.
    pub fn default_root() -> PathBuf {
        if let Some(data_dir) = dirs::data_dir() {
            data_dir.join("cadence")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".cadence-home")
        } else {
            PathBuf::from(".cadence-home")
        }
    }

    /// Walk up from `start` looking for a directory containing `.cadence/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".cadence").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.cadence_dir, &self.summaries_dir, &self.exports_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.cadence_dir.is_dir()
    }

    pub fn fidelity_dir(&self, fidelity: Fidelity) -> PathBuf {
        self.summaries_dir.join(fidelity.as_str())
    }

    pub fn summary_json(&self, fidelity: Fidelity, period: &str) -> PathBuf {
        self.fidelity_dir(fidelity).join(format!("{period}.json"))
    }

    pub fn summary_md(&self, fidelity: Fidelity, period: &str) -> PathBuf {
        self.fidelity_dir(fidelity).join(format!("{period}.md"))
    }
}
