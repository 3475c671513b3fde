use kodebate_models::Persona;
use thiserror::Error;

use crate::state::IllegalTransition;

/// Failure reported by an inference provider for a single call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Transient provider failure: {0}")]
    Transient(String),

    #[error("Provider failure: {0}")]
    Fatal(String),
}

impl InferenceError {
    /// Whether backoff and retry may resolve the failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InferenceError::RateLimited(_) | InferenceError::Transient(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Schema validation failed for {persona} after {attempts} attempts: {last_error}")]
    SchemaValidationFailed {
        persona: Persona,
        attempts: u32,
        last_error: String,
    },

    #[error("Inference provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error(transparent)]
    State(#[from] IllegalTransition),
}

impl AgentError {
    /// Short machine-friendly kind, used in events.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::DataUnavailable(_) => "data_unavailable",
            AgentError::SchemaValidationFailed { .. } => "schema_validation_failed",
            AgentError::ProviderUnavailable(_) => "provider_unavailable",
            AgentError::Timeout(_) => "timeout",
            AgentError::State(_) => "illegal_transition",
        }
    }
}
