use std::sync::Arc;
use std::time::Duration;

use kodebate_models::{Language, Opinion, Persona, RetryConfig};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::budget::InferenceBudget;
use crate::context::DebateContext;
use crate::error::{AgentError, InferenceError};
use crate::events::{self, EventSink};
use crate::inference::{InferenceProvider, Prompt};
use crate::language::LanguageProfile;
use crate::parser;
use crate::prompts;

/// Capped exponential backoff for provider retries.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: u32,
    pub max_retries: u32,
}

impl Backoff {
    /// Delay before provider retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1).checked_pow(retry).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Both retry paths of one persona turn.
///
/// Validation attempts and provider retries are counted separately, so a
/// rate-limited call never burns a validation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Backoff {
                initial: Duration::from_millis(config.initial_backoff_ms),
                max: Duration::from_millis(config.max_backoff_ms),
                multiplier: config.backoff_multiplier,
                max_retries: config.max_provider_retries,
            },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Counters for a single persona turn.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RetryState {
    pub attempts: u32,
    pub provider_retries: u32,
    pub last_error: Option<String>,
}

/// Calls one persona through the provider until it returns a valid opinion
/// or a retry budget runs out.
pub struct AgentInvoker {
    provider: Arc<dyn InferenceProvider>,
    sink: Arc<dyn EventSink>,
    budget: Arc<InferenceBudget>,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl AgentInvoker {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        sink: Arc<dyn EventSink>,
        budget: Arc<InferenceBudget>,
        policy: RetryPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            sink,
            budget,
            policy,
            call_timeout,
        }
    }

    pub async fn invoke(
        &self,
        persona: Persona,
        context: &DebateContext,
    ) -> Result<Opinion, AgentError> {
        let language = context.request().language;
        let mut prompt = prompts::build(persona, context);
        let base_user = prompt.user.clone();
        let corrective = LanguageProfile::for_language(language).corrective_instruction;
        let mut state = RetryState::default();

        while state.attempts < self.policy.max_attempts {
            state.attempts += 1;
            let (raw, latency) = self.complete(&prompt, language, &mut state).await?;

            match parser::validate(persona, &raw) {
                Ok(opinion) => {
                    self.report(persona, &state, latency, "valid");
                    debug!(%persona, attempt = state.attempts, "Persona answered");
                    return Ok(opinion);
                }
                Err(reason) => {
                    self.report(persona, &state, latency, "invalid");
                    warn!(
                        %persona,
                        attempt = state.attempts,
                        error = %reason,
                        "Persona answer failed validation"
                    );
                    state.last_error = Some(reason);
                    prompt.user = format!("{base_user}\n\n{corrective}");
                }
            }
        }

        Err(AgentError::SchemaValidationFailed {
            persona,
            attempts: state.attempts,
            last_error: state.last_error.unwrap_or_default(),
        })
    }

    /// One raw completion, backing off on retryable provider failures.
    async fn complete(
        &self,
        prompt: &Prompt,
        language: Language,
        state: &mut RetryState,
    ) -> Result<(String, Duration), AgentError> {
        loop {
            let permit = self.budget.acquire().await?;
            let started = Instant::now();
            let result = match tokio::time::timeout(
                self.call_timeout,
                self.provider.complete_structured(prompt, language),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(InferenceError::Transient(format!(
                    "call timed out after {}s",
                    self.call_timeout.as_secs()
                ))),
            };
            drop(permit);
            let latency = started.elapsed();

            let err = match result {
                Ok(raw) => return Ok((raw, latency)),
                Err(err) => err,
            };

            let outcome = match err {
                InferenceError::RateLimited(_) => "rate_limited",
                InferenceError::Transient(_) => "transient",
                InferenceError::Fatal(_) => "fatal",
            };
            self.report(prompt.persona, state, latency, outcome);

            if !err.is_retryable() {
                return Err(AgentError::ProviderUnavailable(err.to_string()));
            }
            if state.provider_retries >= self.policy.backoff.max_retries {
                return Err(AgentError::ProviderUnavailable(format!(
                    "{err} (gave up after {} retries)",
                    state.provider_retries
                )));
            }

            let delay = self.policy.backoff.delay(state.provider_retries);
            state.provider_retries += 1;
            warn!(
                persona = %prompt.persona,
                retry = state.provider_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Provider failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn report(&self, persona: Persona, state: &RetryState, latency: Duration, outcome: &str) {
        self.sink.record_event(
            events::AGENT_ATTEMPT,
            serde_json::json!({
                "persona": persona.as_str(),
                "attempt": state.attempts,
                "provider_retries": state.provider_retries,
                "latency_ms": latency.as_millis() as u64,
                "outcome": outcome,
            }),
        );
    }
}
