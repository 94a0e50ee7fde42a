//! Google Generative AI client for the assistant.
//!
//! Single-shot `generateContent` calls; the assistant never streams.

use std::time::Duration;

use async_trait::async_trait;
use devfusion_core::AssistantConfig;
use devfusion_proto::{LanguageModel, ModelError, ModelResult};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Fallback when the API reports failure without a message.
const GENERIC_FAILURE: &str = "Failed to get response from AI.";

/// Google error wrapper.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Creates a client from assistant settings and a resolved API key.
    pub fn new(config: &AssistantConfig, api_key: Option<String>) -> ModelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;
        Ok(Self::with_client(client, config, api_key))
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        config: &AssistantConfig,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request_body(prompt: &str) -> Value {
        json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        })
    }

    fn extract_text(response: GenerateResponse) -> ModelResult<String> {
        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(ModelError::Api {
                status: 400,
                message: format!("Prompt blocked: {reason}"),
            });
        }
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(ModelError::EmptyResponse)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> ModelResult<String> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ModelError::MissingApiKey);
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling Gemini");
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", key)])
            .json(&Self::build_request_body(prompt))
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            warn!(status = status.as_u16(), %message, "Gemini API error");
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        Self::extract_text(parsed)
    }
}
