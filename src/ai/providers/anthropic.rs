//! Message shape, used by Anthropic Claude

use super::{build_client, error_from_response, send_error, MAX_OUTPUT_TOKENS, TEMPERATURE};
use crate::ai::config::{ProviderKind, ProviderSettings};
use crate::ai::error::{AssistError, AssistResult};
use crate::ai::prompts::{build_user_message, SYSTEM_INSTRUCTION};
use crate::ai::provider::CompletionProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API request
#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

/// Messages API response, only the fields read here
#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, request_timeout: Option<Duration>) -> Self {
        Self {
            client: build_client(request_timeout),
            api_key,
            model,
            endpoint: ANTHROPIC_ENDPOINT.to_string(),
        }
    }

    pub fn from_settings(settings: &ProviderSettings, request_timeout: Option<Duration>) -> Self {
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| ProviderKind::Claude.default_model().to_string());
        let mut provider = Self::new(settings.api_key.clone(), model, request_timeout);
        if let Some(endpoint) = &settings.endpoint {
            provider.endpoint = endpoint.clone();
        }
        provider
    }

    fn build_request(&self, context: &str, instruction: &str) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_OUTPUT_TOKENS,
            system: SYSTEM_INSTRUCTION.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: build_user_message(context, instruction),
            }],
            temperature: TEMPERATURE,
        }
    }

    /// Concatenate the text blocks of the reply
    fn extract_text(response: AnthropicResponse) -> AssistResult<String> {
        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(AssistError::transport("Claude", "No content in response"));
        }
        Ok(text)
    }

    fn error_message(body: &str) -> Option<String> {
        serde_json::from_str::<AnthropicErrorResponse>(body)
            .ok()
            .map(|e| e.error.message)
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "Claude"
    }

    async fn complete(&self, context: &str, instruction: &str) -> AssistResult<String> {
        let request = self.build_request(context, instruction);
        tracing::debug!("Sending message request with model {}", self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(self.name(), e))?;

        if !response.status().is_success() {
            return Err(error_from_response(self.name(), response, Self::error_message).await);
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|e| {
            AssistError::transport(self.name(), format!("Failed to parse response: {}", e))
        })?;
        Self::extract_text(parsed)
    }
}
