//! Completion gateway for the compose assistant
//!
//! One provider is chosen from configuration per session. Each provider sends
//! the fixed structured-output instruction and returns the vendor's raw text,
//! which [`CompletionResult::from_response`] parses leniently.

pub mod config;
pub mod error;
pub mod factory;
pub mod prompts;
pub mod provider;
pub mod providers;

pub use config::{AssistConfig, ProviderKind, ProviderSettings, SavedPrompt};
pub use error::{AssistError, AssistResult};
pub use factory::ProviderFactory;
pub use provider::{CompletionProvider, CompletionResult};
pub use providers::{AnthropicProvider, GoogleProvider, OpenAIProvider};
