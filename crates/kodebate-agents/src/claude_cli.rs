use std::time::Duration;

use async_trait::async_trait;
use kodebate_models::{AgentsConfig, Language, Persona};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::InferenceError;
use crate::inference::{InferenceProvider, Prompt};

/// Configuration for a Claude CLI invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaudeCliConfig {
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(45),
        }
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate_limit", "429", "overloaded", "529"];
const FATAL_MARKERS: &[&str] = &[
    "invalid model",
    "model not found",
    "not_found_error",
    "authentication",
    "unauthorized",
    "401",
    "403",
];

/// Map CLI stderr to a failure class.
pub fn classify_failure(stderr: &str) -> InferenceError {
    let lower = stderr.to_lowercase();
    let message = stderr.trim().to_string();
    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        InferenceError::RateLimited(message)
    } else if FATAL_MARKERS.iter().any(|m| lower.contains(m)) {
        InferenceError::Fatal(message)
    } else {
        InferenceError::Transient(message)
    }
}

/// Invoke `binary` (normally `claude`) with a system prompt and user prompt.
/// Returns the raw stdout text.
pub async fn invoke_claude(
    binary: &str,
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
) -> Result<String, InferenceError> {
    debug!(model = %config.model, "Invoking claude CLI");

    let result = tokio::time::timeout(config.timeout, async {
        Command::new(binary)
            .args([
                "-p",
                user_prompt,
                "--system-prompt",
                system_prompt,
                "--model",
                &config.model,
                "--output-format",
                "text",
            ])
            .kill_on_drop(true)
            .output()
            .await
    })
    .await
    .map_err(|_| {
        InferenceError::Transient(format!(
            "claude timed out after {}s",
            config.timeout.as_secs()
        ))
    })?
    .map_err(|e| InferenceError::Fatal(format!("Failed to spawn {binary}: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        warn!(status = %result.status, stderr = %stderr, "Claude CLI failed");
        return Err(classify_failure(&format!(
            "claude exited {}: {}",
            result.status, stderr
        )));
    }

    let stdout = String::from_utf8_lossy(&result.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(InferenceError::Transient(
            "Claude returned empty response".to_string(),
        ));
    }

    Ok(stdout)
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// [`InferenceProvider`] backed by the `claude` CLI.
///
/// Judges run on the judge model, the five debaters on the cheaper debater model.
#[derive(Debug, Clone)]
pub struct ClaudeCliProvider {
    binary: String,
    judge: ClaudeCliConfig,
    debater: ClaudeCliConfig,
}

impl ClaudeCliProvider {
    pub fn new(judge: ClaudeCliConfig, debater: ClaudeCliConfig) -> Self {
        Self {
            binary: "claude".to_string(),
            judge,
            debater,
        }
    }

    pub fn from_config(config: &AgentsConfig) -> Self {
        let timeout = Duration::from_secs(config.call_timeout_seconds);
        Self::new(
            ClaudeCliConfig {
                model: config.judge_model.clone(),
                timeout,
            },
            ClaudeCliConfig {
                model: config.debater_model.clone(),
                timeout,
            },
        )
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn config_for(&self, persona: Persona) -> &ClaudeCliConfig {
        if persona.is_judge() {
            &self.judge
        } else {
            &self.debater
        }
    }
}

/// The CLI takes text only; a chart is passed as a file reference.
fn user_text(prompt: &Prompt) -> String {
    match &prompt.chart {
        Some(chart) => format!("{}\n\nChart image: {}", prompt.user, chart.location),
        None => prompt.user.clone(),
    }
}

#[async_trait]
impl InferenceProvider for ClaudeCliProvider {
    async fn complete_structured(
        &self,
        prompt: &Prompt,
        language: Language,
    ) -> Result<String, InferenceError> {
        debug!(persona = %prompt.persona, ?language, "Requesting completion");
        invoke_claude(
            &self.binary,
            &prompt.system,
            &user_text(prompt),
            self.config_for(prompt.persona),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodebate_models::ChartHandle;

    #[test]
    fn default_config() {
        let config = ClaudeCliConfig::default();
        assert_eq!(config.model, "claude-3-5-haiku-latest");
        assert_eq!(config.timeout, Duration::from_secs(45));
    }

    #[test]
    fn judges_use_the_judge_model() {
        let provider = ClaudeCliProvider::from_config(&AgentsConfig::default());
        assert_eq!(
            provider.config_for(Persona::RiskJudge).model,
            "claude-sonnet-4-5-20250929"
        );
        assert_eq!(
            provider.config_for(Persona::Bull).model,
            "claude-3-5-haiku-latest"
        );
        assert_eq!(
            provider.config_for(Persona::Safe).timeout,
            Duration::from_secs(45)
        );
    }

    #[test]
    fn classifies_failures() {
        assert!(matches!(
            classify_failure("API Error: 429 Too Many Requests"),
            InferenceError::RateLimited(_)
        ));
        assert!(matches!(
            classify_failure("Overloaded, try again"),
            InferenceError::RateLimited(_)
        ));
        assert!(matches!(
            classify_failure("Invalid model: claude-nope"),
            InferenceError::Fatal(_)
        ));
        assert!(matches!(
            classify_failure("connection reset by peer"),
            InferenceError::Transient(_)
        ));
    }

    #[test]
    fn chart_is_referenced_in_user_text() {
        let mut prompt = Prompt {
            persona: Persona::Bull,
            system: "sys".to_string(),
            user: "data".to_string(),
            chart: None,
        };
        assert_eq!(user_text(&prompt), "data");

        prompt.chart = Some(ChartHandle {
            location: "/tmp/aapl.png".to_string(),
            description: None,
        });
        assert!(user_text(&prompt).ends_with("Chart image: /tmp/aapl.png"));
    }

    #[tokio::test]
    async fn missing_binary_is_fatal() {
        let provider = ClaudeCliProvider::from_config(&AgentsConfig::default())
            .with_binary("kodebate-no-such-binary");
        let prompt = Prompt {
            persona: Persona::Bull,
            system: "sys".to_string(),
            user: "ping".to_string(),
            chart: None,
        };
        let err = provider
            .complete_structured(&prompt, Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Fatal(_)));
    }
}
