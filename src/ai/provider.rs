//! Completion gateway capability and completion parsing

use crate::ai::error::AssistResult;
use crate::html::is_html_content;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Tags kept when sanitizing an HTML completion body
const SAFE_TAGS: &[&str] = &[
    "p", "br", "b", "strong", "i", "em", "u", "ul", "ol", "li", "span", "div", "a", "blockquote",
];

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\r?\n?```$").unwrap());

/// One vendor call shape behind a common interface
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Display name used in logs and errors
    fn name(&self) -> &str;

    /// Send the context and instruction with the structured-output system
    /// instruction, returning the vendor's raw text
    async fn complete(&self, context: &str, instruction: &str) -> AssistResult<String>;
}

/// Subject and body pulled out of a completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    #[serde(default)]
    pub subject: String,
    pub body: String,
}

impl CompletionResult {
    /// Parse the vendor's text leniently.
    ///
    /// A JSON object with a string `body` (optionally inside a code fence)
    /// yields its fields. Anything else becomes the body with an empty subject.
    pub fn from_response(raw: &str) -> Self {
        let trimmed = raw.trim();
        let candidate = CODE_FENCE
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map_or(trimmed, |m| m.as_str().trim());

        if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(candidate) {
            if let Some(body) = fields.get("body").and_then(Value::as_str) {
                let subject = fields
                    .get("subject")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                return Self {
                    subject: subject.trim().to_string(),
                    body: body.to_string(),
                };
            }
        }

        tracing::warn!(
            "Completion was not a JSON object with a body, using {} chars of raw text",
            trimmed.chars().count()
        );
        Self {
            subject: String::new(),
            body: trimmed.to_string(),
        }
    }

    pub fn has_subject(&self) -> bool {
        !self.subject.is_empty()
    }

    /// Body ready for formatting: HTML is reduced to a small safe tag set,
    /// text is returned unchanged
    pub fn safe_body(&self) -> String {
        if !is_html_content(&self.body) {
            return self.body.clone();
        }
        let tags: HashSet<&str> = SAFE_TAGS.iter().copied().collect();
        ammonia::Builder::default()
            .tags(tags)
            .clean(&self.body)
            .to_string()
    }
}
