use async_trait::async_trait;
use thiserror::Error;

/// Sampling parameters for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    /// Formal court opening.
    pub const OPENING: Self = Self { temperature: 0.3, max_tokens: 800 };
    /// Opposing counsel; looser sampling for livelier argument.
    pub const LAWYER: Self = Self { temperature: 0.7, max_tokens: 1024 };
    /// Rulings, interventions and directions.
    pub const JUDGE: Self = Self { temperature: 0.3, max_tokens: 512 };
    pub const VERDICT: Self = Self { temperature: 0.3, max_tokens: 1024 };
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Timeout, rate limit, upstream 5xx, connection failure.
    #[error("transient generation failure: {0}")]
    Transient(String),
    /// Bad credentials, unknown model, malformed request.
    #[error("generation failed: {0}")]
    Terminal(String),
    #[error("model returned an empty reply")]
    Empty,
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Terminal(_))
    }
}

/// Black-box text generator backing both the judge and opposing counsel.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, GenerationError>;

    /// Short identifier for logs, e.g. "gemini:gemini-1.5-flash".
    fn name(&self) -> String;
}
