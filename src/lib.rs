pub mod ai;
pub mod cli;
pub mod compose;
pub mod html;

pub use ai::{AssistConfig, AssistError, AssistResult, CompletionProvider, CompletionResult};
pub use compose::{ComposeAssistant, ComposeSession, FileHost, MailHost};
