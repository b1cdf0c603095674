use async_trait::async_trait;
use nyaya_core::llm::{GenerationError, GenerationParams, TextGenerator};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::http;

/// Google Gemini via the public `generateContent` REST endpoint.
pub struct GeminiBackend {
    pub base_url: String,
    pub model: String,
    api_key: String,
    pub timeout_secs: u64,
}

impl GeminiBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs: 60,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Concatenated text of the first candidate.
fn reply_text(resp: &GenerateResponse) -> Option<String> {
    let content = resp.candidates.first()?.content.as_ref()?;
    let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiBackend {
    async fn generate(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            },
        };

        info!(
            model = %self.model,
            prompt_len = prompt.len(),
            temperature = params.temperature,
            "calling gemini generateContent"
        );

        let client = http::client(self.timeout_secs)?;
        let response = client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let err = http::send_error("gemini", &e.without_url(), self.timeout_secs);
                warn!(model = %self.model, "gemini request failed: {}", err);
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = http::status_error("gemini", status, &body);
            warn!(model = %self.model, status = %status, retryable = err.is_retryable(), "gemini returned non-200");
            return Err(err);
        }

        // The request URL carries the API key; keep it out of errors and logs.
        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            warn!(model = %self.model, "failed to parse gemini response: {}", e);
            GenerationError::Transient(format!("unreadable gemini response: {e}"))
        })?;

        let text = reply_text(&parsed).ok_or(GenerationError::Empty)?;
        info!(model = %self.model, output_len = text.len(), "gemini response received");
        Ok(text)
    }

    fn name(&self) -> String {
        format!("gemini:{}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_camel_case() {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 512,
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 512);
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn reply_joins_parts_of_first_candidate() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"The court "},{"text":"is in session."}]}},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(reply_text(&resp).as_deref(), Some("The court is in session."));
    }

    #[test]
    fn blocked_or_blank_reply_is_none() {
        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(reply_text(&blocked).is_none());
        let no_content: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#).unwrap();
        assert!(reply_text(&no_content).is_none());
        let blank: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#)
                .unwrap();
        assert!(reply_text(&blank).is_none());
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let b = GeminiBackend::new("https://example.test/", "gemini-1.5-flash", "k");
        assert_eq!(
            b.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(b.name(), "gemini:gemini-1.5-flash");
    }
}
