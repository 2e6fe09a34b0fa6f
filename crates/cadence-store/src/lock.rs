use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use anyhow::Context;
use fs2::FileExt;

use crate::paths::CadencePaths;

/// Exclusive claim on a workspace's summaries for one generation run.
///
/// The store's exists-then-save sequence is only safe with a single writer;
/// a run holds this from planning until its last document is saved. The
/// holder's pid is recorded in `.cadence/LOCK` so a refused run can name it.
#[derive(Debug)]
pub struct GenerationLock {
    file: File,
}

impl GenerationLock {
    /// Claim the workspace, failing at once if another run holds it.
    pub fn acquire(paths: &CadencePaths) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&paths.cadence_dir)
            .with_context(|| format!("creating {}", paths.cadence_dir.display()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&paths.lock_file)
            .with_context(|| format!("opening {}", paths.lock_file.display()))?;

        if file.try_lock_exclusive().is_err() {
            let mut holder = String::new();
            let _ = file.read_to_string(&mut holder);
            let holder = holder.trim();
            if holder.is_empty() {
                anyhow::bail!("another generation is already running in {}", paths.root.display());
            }
            anyhow::bail!(
                "another generation is already running in {} (pid {holder})",
                paths.root.display()
            );
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;
        tracing::debug!(lock = %paths.lock_file.display(), "generation lock acquired");
        Ok(Self { file })
    }
}

impl Drop for GenerationLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_run_is_refused_until_release() {
        let tmp = tempfile::tempdir().unwrap();
        let p = CadencePaths::discover(tmp.path());

        let lock = GenerationLock::acquire(&p).unwrap();
        let recorded = std::fs::read_to_string(&p.lock_file).unwrap();
        assert_eq!(recorded, std::process::id().to_string());

        let err = GenerationLock::acquire(&p).unwrap_err();
        assert!(err.to_string().contains("already running"));

        drop(lock);
        assert_eq!(std::fs::read_to_string(&p.lock_file).unwrap(), "");
        let _again = GenerationLock::acquire(&p).unwrap();
    }
}
