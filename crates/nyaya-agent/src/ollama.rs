use async_trait::async_trait;
use nyaya_core::llm::{GenerationError, GenerationParams, TextGenerator};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::http;

/// Calls a locally-hosted Ollama model via its native chat API.
///
/// Keeps practice material on the local machine. Each call is a single
/// stateless user message; the coordinator renders history into the prompt.
pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            timeout_secs: 60,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[async_trait]
impl TextGenerator for OllamaBackend {
    async fn generate(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, GenerationError> {
        let request_body = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        info!(
            model = %self.model,
            base_url = %self.base_url,
            prompt_len = prompt.len(),
            "calling ollama chat API"
        );

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let client = http::client(self.timeout_secs)?;

        let response = match client.post(&url).json(&request_body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!(
                    model = %self.model,
                    timeout_secs = self.timeout_secs,
                    "ollama request timed out"
                );
                return Err(http::send_error("ollama", &e, self.timeout_secs));
            },
            Err(e) => {
                warn!(model = %self.model, "ollama request failed: {}", e);
                return Err(http::send_error("ollama", &e, self.timeout_secs));
            },
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                model = %self.model,
                status = %status,
                "ollama returned non-200: {}",
                body
            );
            return Err(http::status_error("ollama", status, &body));
        }

        let parsed: OllamaChatResponse = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(model = %self.model, "failed to parse ollama response: {}", e);
                return Err(GenerationError::Transient(format!(
                    "unreadable ollama response: {e}"
                )));
            },
        };

        let output = parsed.message.content;
        if output.trim().is_empty() {
            return Err(GenerationError::Empty);
        }

        info!(
            model = %self.model,
            output_len = output.len(),
            "ollama response received"
        );
        Ok(output)
    }

    fn name(&self) -> String {
        format!("ollama:{}", self.model)
    }
}
