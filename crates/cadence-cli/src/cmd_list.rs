use std::path::Path;

use anyhow::Result;
use cadence_core::Fidelity;
use cadence_store::{CadencePaths, DocumentStore, FsDocumentStore};

/// Execute `cadence list <fidelity>`
pub fn execute(root: &Path, fidelity: Fidelity) -> Result<()> {
    let store = FsDocumentStore::new(CadencePaths::discover(root));
    let periods = store.list(fidelity)?;
    if periods.is_empty() {
        println!(
            "No {fidelity} summaries yet in {}",
            store.paths().fidelity_dir(fidelity).display()
        );
        return Ok(());
    }
    for period in periods {
        println!("{period}");
    }
    Ok(())
}
