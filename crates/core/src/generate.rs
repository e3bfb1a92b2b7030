use thiserror::Error;

use crate::domain::job::JobContext;

/// One constrained generation request issued by the question resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub job: &'a JobContext,
    /// When non-empty, the backend output must be one of these values.
    pub allowed_choices: &'a [String],
    pub max_chars: usize,
    /// Set on the single retry after a constraint violation so the backend
    /// can tighten its instructions.
    pub strict_retry: bool,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend failure: {0}")]
    Backend(String),
    #[error("generated answer `{answer}` is not one of the allowed choices")]
    ConstraintViolation { answer: String },
}

/// Injected generative capability. The core functions fully without one:
/// every resolver path degrades to a deterministic fallback or an
/// escalation when no backend is supplied.
pub trait GenerativeBackend: Send + Sync {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError>;
}
