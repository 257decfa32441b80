//! Capture cadence and the rewrite action
//!
//! All session state lives inside one task. A periodic tick re-captures the
//! compose body and commands arrive over a channel, so captures and rewrites
//! never interleave.

use crate::ai::error::{AssistError, AssistResult};
use crate::ai::prompts::build_context;
use crate::ai::provider::{CompletionProvider, CompletionResult};
use crate::compose::formatter::assemble_replacement_body;
use crate::compose::host::MailHost;
use crate::compose::session::{Capture, ComposeSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// How often the compose body is re-captured
pub const CAPTURE_INTERVAL: Duration = Duration::from_secs(1);

/// Commands accepted by a running assistant
#[derive(Debug, Clone)]
pub enum AssistCommand {
    /// Rewrite the draft following `instruction`
    Process { instruction: String },
    /// Stop the loop
    Shutdown,
}

/// Events emitted by a running assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistEvent {
    Captured { draft_chars: usize, thread_chars: usize },
    Processed { subject: Option<String> },
    Failed(String),
}

/// Handle for talking to a spawned assistant
pub struct AssistantHandle {
    pub cmd_tx: mpsc::Sender<AssistCommand>,
    pub event_rx: mpsc::Receiver<AssistEvent>,
}

/// Owns the session, the host and the provider for one compose window
pub struct ComposeAssistant {
    session: ComposeSession,
    host: Arc<dyn MailHost>,
    provider: Box<dyn CompletionProvider>,
    max_context_chars: usize,
    capture_interval: Duration,
}

impl ComposeAssistant {
    pub fn new(
        host: Arc<dyn MailHost>,
        provider: Box<dyn CompletionProvider>,
        max_context_chars: usize,
    ) -> Self {
        Self {
            session: ComposeSession::new(),
            host,
            provider,
            max_context_chars,
            capture_interval: CAPTURE_INTERVAL,
        }
    }

    /// Replace the session, e.g. one started with a known signature template
    pub fn with_session(mut self, session: ComposeSession) -> Self {
        self.session = session;
        self
    }

    pub fn with_capture_interval(mut self, interval: Duration) -> Self {
        self.capture_interval = interval;
        self
    }

    pub fn session(&self) -> &ComposeSession {
        &self.session
    }

    /// Read the compose body and re-segment it
    pub async fn capture(&mut self) -> AssistResult<Capture> {
        let html = self.host.get_body_html().await?;
        Ok(self.session.capture(&html).clone())
    }

    /// Rewrite the draft region and put signature and thread back.
    ///
    /// The body is written first. The subject is only written once the body
    /// write succeeded, and only when the completion carries one. A failed
    /// subject write puts the previous body back.
    pub async fn process(&mut self, instruction: &str) -> AssistResult<CompletionResult> {
        if instruction.trim().is_empty() {
            return Err(AssistError::config_error("Instruction is empty"));
        }

        let capture = match self.session.last_capture() {
            Some(capture) => capture.clone(),
            None => {
                // the body may already hold a draft, so it cannot seed a template
                self.session.stop_learning();
                self.capture().await?
            }
        };

        let context = build_context(&capture.draft_text, &capture.thread_text, self.max_context_chars);
        tracing::debug!(
            "Requesting completion from {} with {} context chars",
            self.provider.name(),
            context.chars().count()
        );
        let raw = self.provider.complete(&context, instruction).await?;
        let result = CompletionResult::from_response(&raw);

        let html = self.host.get_body_html().await?;
        let fragments = self.session.preservable_fragments(&html);
        let body = assemble_replacement_body(
            &result.safe_body(),
            &fragments.signature_html,
            &fragments.thread_html,
        );

        self.host.set_body_html(&body).await?;
        if result.has_subject() {
            if let Err(e) = self.host.set_subject(&result.subject).await {
                if let Err(restore) = self.host.set_body_html(&html).await {
                    tracing::error!("Failed to restore the draft after a subject error: {}", restore);
                }
                return Err(e);
            }
        }

        tracing::info!(
            "Draft replaced ({} bytes, signature {} bytes, thread {} bytes)",
            body.len(),
            fragments.signature_html.len(),
            fragments.thread_html.len()
        );
        Ok(result)
    }

    /// Serve commands and capture on every tick until shut down or every
    /// command sender is dropped
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<AssistCommand>,
        events: mpsc::Sender<AssistEvent>,
    ) {
        let mut ticker = tokio::time::interval(self.capture_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let event = match self.capture().await {
                        Ok(capture) => AssistEvent::Captured {
                            draft_chars: capture.draft_text.chars().count(),
                            thread_chars: capture.thread_text.chars().count(),
                        },
                        Err(e) => {
                            tracing::warn!("Capture failed: {}", e);
                            AssistEvent::Failed(e.user_message())
                        }
                    };
                    // capture events are advisory, drop them when nobody keeps up
                    let _ = events.try_send(event);
                }
                command = commands.recv() => match command {
                    Some(AssistCommand::Process { instruction }) => {
                        let event = match self.process(&instruction).await {
                            Ok(result) => AssistEvent::Processed {
                                subject: result.has_subject().then_some(result.subject),
                            },
                            Err(e) => {
                                tracing::warn!("Processing failed: {}", e);
                                AssistEvent::Failed(e.user_message())
                            }
                        };
                        if events.send(event).await.is_err() {
                            tracing::warn!("Assistant: event receiver dropped");
                            break;
                        }
                    }
                    Some(AssistCommand::Shutdown) | None => break,
                },
            }
        }
        tracing::debug!("Assistant stopped after {} captures", self.session.capture_count());
    }
}

/// Spawn the assistant loop on the current runtime
pub fn spawn_assistant(assistant: ComposeAssistant) -> AssistantHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);

    tokio::spawn(assistant.run(cmd_rx, event_tx));

    AssistantHandle { cmd_tx, event_rx }
}
