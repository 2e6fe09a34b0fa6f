use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use cadence_core::RecurringTheme;
use serde::Deserialize;

use super::{
    classification_prompt, parse_classifications, parse_themes, CategorizeRequest, Categorizer,
    Classification,
};
use crate::config::CategorizerConfig;
use crate::error::CategorizeError;

/// Categorizes by shelling out to `claude -p <prompt> --output-format json`.
pub struct ClaudeCategorizer {
    pub claude_bin: PathBuf,
    pub model: Option<String>,
    pub timeout_sec: u64,
}

impl Default for ClaudeCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaudeCategorizer {
    pub fn new() -> Self {
        Self {
            claude_bin: PathBuf::from("claude"),
            model: None,
            timeout_sec: 120,
        }
    }

    pub fn from_config(config: &CategorizerConfig) -> Self {
        Self {
            claude_bin: PathBuf::from(&config.bin),
            model: config.model.clone(),
            timeout_sec: config.timeout_sec,
        }
    }

    /// Run one prompt and return the model's result text.
    async fn ask(&self, prompt: &str) -> Result<String, CategorizeError> {
        let mut cmd = tokio::process::Command::new(&self.claude_bin);
        cmd.arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Allow nesting inside another claude session
            .env_remove("CLAUDE_CODE")
            .env_remove("CLAUDECODE")
            .kill_on_drop(true);
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }

        let child = cmd.spawn().map_err(|e| {
            CategorizeError::Unavailable(format!("{}: {e}", self.claude_bin.display()))
        })?;

        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| CategorizeError::Process(e.to_string()))?
            }
            _ = tokio::time::sleep(Duration::from_secs(self.timeout_sec)) => {
                return Err(CategorizeError::Timeout(self.timeout_sec));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CategorizeError::Process(format!(
                "exit {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        result_text(&String::from_utf8_lossy(&output.stdout))
    }
}

/// The `--output-format json` envelope.
#[derive(Deserialize)]
struct ResultEnvelope {
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    result: Option<String>,
}

/// Pull the result text out of the CLI's JSON envelope.
fn result_text(stdout: &str) -> Result<String, CategorizeError> {
    let envelope: ResultEnvelope = serde_json::from_str(stdout.trim())
        .map_err(|e| CategorizeError::Malformed(format!("unexpected CLI output: {e}")))?;
    if envelope.is_error {
        return Err(CategorizeError::Process(format!(
            "claude reported an error ({})",
            envelope.subtype.as_deref().unwrap_or("unknown")
        )));
    }
    envelope
        .result
        .ok_or_else(|| CategorizeError::Malformed("missing result text".into()))
}

#[async_trait::async_trait]
impl Categorizer for ClaudeCategorizer {
    async fn categorize(
        &self,
        requests: &[CategorizeRequest],
    ) -> Result<Vec<Classification>, CategorizeError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let text = self.ask(&classification_prompt(requests)).await?;
        parse_classifications(&text, requests.len())
    }

    async fn extract_themes(&self, prompt: &str) -> Result<Vec<RecurringTheme>, CategorizeError> {
        let text = self.ask(prompt).await?;
        parse_themes(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_success() {
        let out = r#"{"type":"result","subtype":"success","is_error":false,"result":"[{\"index\":0}]"}"#;
        assert_eq!(result_text(out).unwrap(), "[{\"index\":0}]");
    }

    #[test]
    fn envelope_error() {
        let out = r#"{"type":"result","subtype":"error_max_turns","is_error":true}"#;
        assert!(matches!(result_text(out), Err(CategorizeError::Process(_))));
        assert!(matches!(
            result_text("not json"),
            Err(CategorizeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let categorizer = ClaudeCategorizer {
            claude_bin: PathBuf::from("/nonexistent/claude-bin"),
            model: None,
            timeout_sec: 5,
        };
        let requests = vec![CategorizeRequest {
            source: cadence_core::SourceType::Github,
            title: "Merge PR #1".into(),
            description: None,
        }];
        assert!(matches!(
            categorizer.categorize(&requests).await,
            Err(CategorizeError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn empty_batch_skips_the_process() {
        let categorizer = ClaudeCategorizer {
            claude_bin: PathBuf::from("/nonexistent/claude-bin"),
            model: None,
            timeout_sec: 5,
        };
        assert!(categorizer.categorize(&[]).await.unwrap().is_empty());
    }
}
