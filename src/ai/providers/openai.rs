//! Chat-completion shape, used by OpenAI and by custom compatible endpoints

use super::{build_client, error_from_response, send_error, MAX_OUTPUT_TOKENS, TEMPERATURE};
use crate::ai::config::{ProviderKind, ProviderSettings};
use crate::ai::error::{AssistError, AssistResult};
use crate::ai::prompts::{build_user_message, SYSTEM_INSTRUCTION};
use crate::ai::provider::CompletionProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Chat completion request
#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Chat completion response, only the fields read here
#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

/// Chat-completion provider
pub struct OpenAIProvider {
    client: Client,
    name: String,
    api_key: String,
    model: String,
    endpoint: String,
    json_mode: bool,
}

impl OpenAIProvider {
    /// Provider for api.openai.com
    pub fn new(api_key: String, model: String, request_timeout: Option<Duration>) -> Self {
        Self {
            client: build_client(request_timeout),
            name: "OpenAI".to_string(),
            api_key,
            model,
            endpoint: OPENAI_ENDPOINT.to_string(),
            json_mode: true,
        }
    }

    /// Provider for a compatible endpoint; JSON mode is not requested since
    /// not every server supports it
    pub fn custom(
        endpoint: String,
        api_key: String,
        model: String,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            client: build_client(request_timeout),
            name: "Custom".to_string(),
            api_key,
            model,
            endpoint,
            json_mode: false,
        }
    }

    /// Build from settings for either the OpenAI or the custom kind
    pub fn from_settings(
        kind: ProviderKind,
        settings: &ProviderSettings,
        request_timeout: Option<Duration>,
    ) -> AssistResult<Self> {
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string());

        match (kind, &settings.endpoint) {
            (ProviderKind::Custom, Some(endpoint)) => Ok(Self::custom(
                endpoint.clone(),
                settings.api_key.clone(),
                model,
                request_timeout,
            )),
            (ProviderKind::Custom, None) => Err(AssistError::config_error(
                "Custom provider requires an endpoint",
            )),
            (_, endpoint) => {
                let mut provider = Self::new(settings.api_key.clone(), model, request_timeout);
                if let Some(endpoint) = endpoint {
                    provider.endpoint = endpoint.clone();
                }
                Ok(provider)
            }
        }
    }

    fn build_request(&self, context: &str, instruction: &str) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: build_user_message(context, instruction),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
            response_format: self.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    fn extract_text(&self, response: OpenAIResponse) -> AssistResult<String> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AssistError::transport(&self.name, "No choices in response"))
    }

    fn error_message(body: &str) -> Option<String> {
        serde_json::from_str::<OpenAIErrorResponse>(body)
            .ok()
            .map(|e| e.error.message)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, context: &str, instruction: &str) -> AssistResult<String> {
        let request = self.build_request(context, instruction);
        tracing::debug!("Sending chat completion to {} with model {}", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(&self.name, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Self::error_message).await);
        }

        let parsed: OpenAIResponse = response.json().await.map_err(|e| {
            AssistError::transport(&self.name, format!("Failed to parse response: {}", e))
        })?;
        self.extract_text(parsed)
    }
}
