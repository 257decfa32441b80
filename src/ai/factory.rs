//! Choosing and building the completion gateway from configuration

use crate::ai::config::{AssistConfig, ProviderKind};
use crate::ai::error::AssistResult;
use crate::ai::provider::CompletionProvider;
use crate::ai::providers::{AnthropicProvider, GoogleProvider, OpenAIProvider};

/// Builds the one provider a session talks to
pub struct ProviderFactory;

impl ProviderFactory {
    /// Validate the configuration and build the active provider.
    ///
    /// Configuration problems surface here, before any request is made.
    pub fn create_provider(config: &AssistConfig) -> AssistResult<Box<dyn CompletionProvider>> {
        config.validate()?;

        let kind = config.active_kind()?;
        let settings = config.active_settings()?;
        let timeout = config.request_timeout();

        let provider: Box<dyn CompletionProvider> = match kind {
            ProviderKind::OpenAI | ProviderKind::Custom => {
                Box::new(OpenAIProvider::from_settings(kind, settings, timeout)?)
            }
            ProviderKind::Claude => Box::new(AnthropicProvider::from_settings(settings, timeout)),
            ProviderKind::Gemini => Box::new(GoogleProvider::from_settings(settings, timeout)),
        };

        tracing::info!(
            "Using {} provider '{}'",
            provider.name(),
            config.active_provider
        );
        Ok(provider)
    }
}
