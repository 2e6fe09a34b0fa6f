use std::path::Path;

use anyhow::{bail, Result};
use cadence_core::Fidelity;
use cadence_store::{render_markdown, CadencePaths, DocumentStore, FsDocumentStore};

/// Execute `cadence show <fidelity> <period>`
pub fn execute(root: &Path, fidelity: Fidelity, period: &str, json: bool) -> Result<()> {
    let store = FsDocumentStore::new(CadencePaths::discover(root));
    let Some(doc) = store.load(fidelity, period)? else {
        bail!("no {fidelity} summary for {period}; run `cadence generate {fidelity} {period}`");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", render_markdown(&doc));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_summary_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = execute(tmp.path(), Fidelity::Weekly, "2025-W03", false).unwrap_err();
        assert!(err.to_string().contains("cadence generate weekly 2025-W03"));
    }

    #[test]
    fn malformed_period_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(execute(tmp.path(), Fidelity::Weekly, "2025-03", true).is_err());
    }
}
