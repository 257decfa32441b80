//! Vendor call shapes

pub mod anthropic;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use openai::OpenAIProvider;

use crate::ai::error::AssistError;
use reqwest::{Client, Response};
use std::time::Duration;

/// Sampling temperature for rewrites
const TEMPERATURE: f32 = 0.4;

/// Upper bound on generated tokens
const MAX_OUTPUT_TOKENS: u32 = 2048;

/// HTTP client with an optional overall request timeout
fn build_client(request_timeout: Option<Duration>) -> Client {
    let builder = Client::builder();
    let builder = match request_timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    builder.build().unwrap_or_default()
}

/// Turn a non-success response into a transport error, using the vendor's
/// message when `extract_message` can find one in the body
async fn error_from_response(
    provider: &str,
    response: Response,
    extract_message: fn(&str) -> Option<String>,
) -> AssistError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = extract_message(&text).unwrap_or(text);
    tracing::warn!("{} returned HTTP {}", provider, status);
    AssistError::http_status(provider, status, message)
}

fn send_error(provider: &str, err: reqwest::Error) -> AssistError {
    if err.is_timeout() {
        AssistError::transport(provider, "request timed out")
    } else {
        AssistError::transport(provider, err.to_string())
    }
}
