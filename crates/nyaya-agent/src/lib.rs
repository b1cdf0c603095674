pub mod gemini;
mod http;
pub mod ollama;

use std::sync::Arc;

use nyaya_core::{
    config::{Config, LlmBackend},
    llm::TextGenerator,
};

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;

/// Build the configured generator. The HTTP timeout is padded past the
/// coordinator's own deadline so the coordinator is the one that gives up.
pub fn backend_from_config(config: &Config) -> Arc<dyn TextGenerator> {
    let timeout = config.llm_timeout_s.saturating_add(5);
    match config.llm_backend {
        LlmBackend::Gemini => Arc::new(
            GeminiBackend::new(
                &config.gemini_base_url,
                &config.gemini_model,
                &config.google_api_key,
            )
            .with_timeout(timeout),
        ),
        LlmBackend::Ollama => Arc::new(
            OllamaBackend::new(&config.ollama_base_url, &config.ollama_model)
                .with_timeout(timeout),
        ),
    }
}
