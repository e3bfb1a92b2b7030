use applypilot_core::{GenerationError, GenerationRequest, GenerativeBackend};
use tracing::debug;

use crate::prompts::question_prompt;

/// Pluggable text-completion transport. Implementations (HTTP providers,
/// local models, test fakes) are supplied by the orchestrator; this crate
/// never opens a connection itself.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

/// Adapts a `CompletionClient` into the core's `GenerativeBackend` seam by
/// rendering resolver requests into prompts and passing raw completions
/// back for the core to validate.
pub struct PromptBackend<C> {
    client: C,
}

impl<C> PromptBackend<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: CompletionClient> GenerativeBackend for PromptBackend<C> {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        let rendered = question_prompt(request);
        debug!(
            prompt = %request.prompt,
            constrained = !request.allowed_choices.is_empty(),
            strict_retry = request.strict_retry,
            "dispatching generation request"
        );

        let completion = self
            .client
            .complete(&rendered.system, &rendered.user)
            .map_err(|error| GenerationError::Backend(error.to_string()))?;
        Ok(completion.trim().to_string())
    }
}
