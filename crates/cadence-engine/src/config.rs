use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use anyhow::{bail, Context, Result};
use cadence_core::SourceType;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Engine configuration, read from `.cadence/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub collectors: Vec<CollectorConfig>,
    pub categorizer: CategorizerConfig,
    pub trends: TrendConfig,
    /// Sources skipped even when a collector is configured for them.
    pub disabled_sources: Vec<SourceType>,
}

/// A JSONL export feeding one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub source: SourceType,
    /// Relative paths resolve against the workspace root.
    pub path: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CollectorConfig {
    pub fn resolve_path(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorizerKind {
    /// Shell out to the `claude` CLI.
    Claude,
    /// No categorization; every item takes the default classification.
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizerConfig {
    pub kind: CategorizerKind,
    pub bin: String,
    pub model: Option<String>,
    pub timeout_sec: u64,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            kind: CategorizerKind::None,
            bin: "claude".to_string(),
            model: None,
            timeout_sec: 120,
        }
    }
}

/// Thresholds for period-over-period comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// How many previous periods feed recurring-theme detection.
    pub history_window: usize,
    /// Incidents are `increasing` above `previous × increase_factor`.
    pub increase_factor: f64,
    /// Incidents are `decreasing` below `previous × decrease_factor`.
    pub decrease_factor: f64,
    /// Delivery below `previous × velocity_drop_factor` triggers a velocity check.
    pub velocity_drop_factor: f64,
    /// Occurrences at which a recurring theme needs dedicated attention.
    pub recurring_theme_min: u32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            history_window: 5,
            increase_factor: 1.2,
            decrease_factor: 0.8,
            velocity_drop_factor: 0.7,
            recurring_theme_min: 3,
        }
    }
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Collectors that are enabled and whose source is not disabled.
    pub fn active_collectors(&self) -> impl Iterator<Item = &CollectorConfig> {
        self.collectors
            .iter()
            .filter(|c| c.enabled && !self.disabled_sources.contains(&c.source))
    }
}

/// Load config from `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(EngineConfig::default());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config {}", path.display()))
}

/// Parse and validate config from a YAML string.
pub fn parse_config(yaml: &str) -> Result<EngineConfig> {
    if yaml.trim().is_empty() {
        return Ok(EngineConfig::default());
    }
    let mut raw: serde_yaml::Value = serde_yaml::from_str(yaml).context("invalid YAML syntax")?;
    expand_variables(&mut raw)?;
    let config: EngineConfig =
        serde_yaml::from_value(raw).context("config schema validation failed")?;
    validate_config(&config)?;
    Ok(config)
}

static ENV_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Substitute `${{ env.NAME }}` in every string scalar of the document.
/// A reference to an unset variable is an error naming it.
fn expand_variables(value: &mut serde_yaml::Value) -> Result<()> {
    match value {
        serde_yaml::Value::String(text) => {
            if let Some(expanded) = substitute_env(text)? {
                *text = expanded;
            }
        }
        serde_yaml::Value::Mapping(map) => {
            map.iter_mut().try_for_each(|(_, v)| expand_variables(v))?;
        }
        serde_yaml::Value::Sequence(items) => {
            items.iter_mut().try_for_each(expand_variables)?;
        }
        _ => {}
    }
    Ok(())
}

/// `None` when `text` holds no env reference.
fn substitute_env(text: &str) -> Result<Option<String>> {
    if !ENV_REF.is_match(text) {
        return Ok(None);
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in ENV_REF.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[1];
        let value = std::env::var(name)
            .with_context(|| format!("config references unset environment variable {name}"))?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(Some(out))
}

/// Constraints serde cannot express.
fn validate_config(config: &EngineConfig) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for collector in &config.collectors {
        if collector.path.trim().is_empty() {
            bail!("collector for {} has an empty path", collector.source);
        }
        if !seen.insert(collector.source) {
            bail!("duplicate collector for source: {}", collector.source);
        }
    }

    if config.categorizer.timeout_sec == 0 {
        bail!("categorizer.timeout_sec must be positive");
    }
    if config.categorizer.kind == CategorizerKind::Claude && config.categorizer.bin.trim().is_empty()
    {
        bail!("categorizer.bin must name the claude executable");
    }

    let t = &config.trends;
    if !(t.increase_factor.is_finite() && t.increase_factor >= 1.0) {
        bail!("trends.increase_factor must be >= 1.0, got {}", t.increase_factor);
    }
    if !(t.decrease_factor > 0.0 && t.decrease_factor <= 1.0) {
        bail!("trends.decrease_factor must be in (0, 1], got {}", t.decrease_factor);
    }
    if !(t.velocity_drop_factor > 0.0 && t.velocity_drop_factor <= 1.0) {
        bail!(
            "trends.velocity_drop_factor must be in (0, 1], got {}",
            t.velocity_drop_factor
        );
    }
    if t.recurring_theme_min == 0 {
        bail!("trends.recurring_theme_min must be positive");
    }
    Ok(())
}

/// Lazily loaded, shared, read-only configuration.
///
/// The file is read on the first [`get`](Self::get); later calls hand out the
/// same `Arc` until [`reload`](Self::reload) replaces it.
pub struct ConfigCell {
    path: PathBuf,
    current: Mutex<Option<Arc<EngineConfig>>>,
}

impl ConfigCell {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Result<Arc<EngineConfig>> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(config) = current.as_ref() {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(load_config(&self.path)?);
        *current = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Re-read the file. Holders of the previous `Arc` keep their snapshot.
    pub fn reload(&self) -> Result<Arc<EngineConfig>> {
        let config = Arc::new(load_config(&self.path)?);
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&config));
        Ok(config)
    }
}

/// Commented starter config written by `cadence init`.
pub const DEFAULT_CONFIG_YAML: &str = r#"# Cadence configuration.
#
# Each collector reads a JSONL export (one item per line:
# {"title": ..., "date": "YYYY-MM-DD", "description"?, "url"?, "id"?, "todo"?: {"id", "status"}}).
# Relative paths resolve against the workspace root.
collectors: []
#  - source: github
#    path: exports/github.jsonl
#  - source: incidents
#    path: exports/incidents.jsonl
#    enabled: false

categorizer:
  kind: claude        # claude | none
  bin: claude
  timeout_sec: 120
#  model: sonnet

trends:
  history_window: 5
  increase_factor: 1.2
  decrease_factor: 0.8
  velocity_drop_factor: 0.7
  recurring_theme_min: 3

disabled_sources: []
"#;
