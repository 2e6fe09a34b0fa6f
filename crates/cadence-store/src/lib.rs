pub mod lock;
pub mod paths;
pub mod render;
pub mod store;

pub use lock::GenerationLock;
pub use paths::CadencePaths;
pub use render::render_markdown;
pub use store::{DocumentStore, FsDocumentStore, MemoryDocumentStore};

use std::io::Write;
use std::path::Path;

use anyhow::Context;

/// Replace `path` with `data` in one step: the bytes go to a synced temp file
/// beside it, which is then renamed over the target.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut staged = tempfile::Builder::new()
        .prefix(".cadence-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("staging write in {}", dir.display()))?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
