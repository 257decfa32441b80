//! Generate-content shape, used by Google Gemini

use super::{build_client, error_from_response, send_error, MAX_OUTPUT_TOKENS, TEMPERATURE};
use crate::ai::config::{ProviderKind, ProviderSettings};
use crate::ai::error::{AssistError, AssistResult};
use crate::ai::prompts::{build_user_message, SYSTEM_INSTRUCTION};
use crate::ai::provider::CompletionProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// generateContent request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: String,
}

/// generateContent response, only the fields read here
#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiError {
    message: String,
}

/// Gemini provider
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(api_key: String, model: String, request_timeout: Option<Duration>) -> Self {
        Self {
            client: build_client(request_timeout),
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn from_settings(settings: &ProviderSettings, request_timeout: Option<Duration>) -> Self {
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| ProviderKind::Gemini.default_model().to_string());
        let mut provider = Self::new(settings.api_key.clone(), model, request_timeout);
        if let Some(endpoint) = &settings.endpoint {
            provider.base_url = endpoint.trim_end_matches('/').to_string();
        }
        provider
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, context: &str, instruction: &str) -> GeminiRequest {
        GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: build_user_message(context, instruction),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json".to_string(),
            },
        }
    }

    /// Text parts of the first candidate
    fn extract_text(response: GeminiResponse) -> AssistResult<String> {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AssistError::transport("Gemini", "No candidates in response"));
        }
        Ok(text)
    }

    fn error_message(body: &str) -> Option<String> {
        serde_json::from_str::<GeminiErrorResponse>(body)
            .ok()
            .map(|e| e.error.message)
    }
}

#[async_trait]
impl CompletionProvider for GoogleProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn complete(&self, context: &str, instruction: &str) -> AssistResult<String> {
        let request = self.build_request(context, instruction);
        tracing::debug!("Sending generateContent with model {}", self.model);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(self.name(), e))?;

        if !response.status().is_success() {
            return Err(error_from_response(self.name(), response, Self::error_message).await);
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            AssistError::transport(self.name(), format!("Failed to parse response: {}", e))
        })?;
        Self::extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_provider() -> GoogleProvider {
        GoogleProvider::new("g-key".to_string(), "gemini-1.5-flash".to_string(), None)
    }

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(create_test_provider().build_request("ctx", "Polish")).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], SYSTEM_INSTRUCTION);
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "ctx\n\nInstruction:\nPolish");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], MAX_OUTPUT_TOKENS);
    }

    #[test]
    fn test_url_and_custom_base() {
        assert_eq!(
            create_test_provider().url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );

        let settings = ProviderSettings {
            api_key: "k".to_string(),
            endpoint: Some("http://proxy.local/models/".to_string()),
            model: Some("gemini-pro".to_string()),
        };
        let provider = GoogleProvider::from_settings(&settings, None);
        assert_eq!(provider.url(), "http://proxy.local/models/gemini-pro:generateContent");
    }

    #[test]
    fn test_extract_text() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "{\"body\":"}, {"text": " \"Hi\"}"}]}, "finishReason": "STOP", "index": 0}]}"#,
        )
        .unwrap();
        assert_eq!(
            GoogleProvider::extract_text(response).unwrap(),
            r#"{"body": "Hi"}"#
        );

        let blocked: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(GoogleProvider::extract_text(blocked).is_err());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            GoogleProvider::error_message(body).as_deref(),
            Some("API key not valid.")
        );
    }
}
