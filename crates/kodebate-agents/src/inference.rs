use async_trait::async_trait;
use kodebate_models::{ChartHandle, Language, Persona};

use crate::error::InferenceError;

/// A fully assembled prompt for one persona turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub persona: Persona,
    pub system: String,
    pub user: String,
    /// Chart the provider may attach for vision-capable models.
    pub chart: Option<ChartHandle>,
}

/// The external text-completion capability. Mockable for testing.
///
/// Implementations return the raw model text; validation happens in the invoker.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn complete_structured(
        &self,
        prompt: &Prompt,
        language: Language,
    ) -> Result<String, InferenceError>;
}
