use std::path::Path;

use cadence_engine::config::DEFAULT_CONFIG_YAML;
use cadence_store::{write_atomic, CadencePaths};

/// Execute `cadence init`
pub fn execute(root: &Path) -> anyhow::Result<()> {
    let paths = CadencePaths::discover(root);
    let existed = paths.is_initialized();
    paths.ensure_layout()?;

    if !paths.config_yaml.exists() {
        write_atomic(&paths.config_yaml, DEFAULT_CONFIG_YAML.as_bytes())?;
        println!("Wrote {}", paths.config_yaml.display());
    }

    if existed {
        println!("Already initialized at {}", paths.cadence_dir.display());
    } else {
        println!("Initialized {}", paths.cadence_dir.display());
        println!("  Add collectors to config.yaml, then run: cadence generate daily");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_layout_and_keeps_config() {
        let tmp = tempfile::tempdir().unwrap();
        execute(tmp.path()).unwrap();

        let paths = CadencePaths::discover(tmp.path());
        assert!(paths.summaries_dir.is_dir());
        assert!(paths.exports_dir.is_dir());
        let written = std::fs::read_to_string(&paths.config_yaml).unwrap();
        assert!(cadence_engine::parse_config(&written).is_ok());

        std::fs::write(&paths.config_yaml, "disabled_sources: [slack]\n").unwrap();
        execute(tmp.path()).unwrap();
        let kept = std::fs::read_to_string(&paths.config_yaml).unwrap();
        assert_eq!(kept, "disabled_sources: [slack]\n");
    }
}
