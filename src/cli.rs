use crate::ai::{AssistConfig, CompletionProvider, ProviderFactory};
use crate::compose::{
    format_for_insertion, segment, spawn_assistant, AssistCommand, AssistEvent, ComposeAssistant,
    ComposeSession, FileHost, MailHost,
};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "compose-assist")]
#[command(about = "Rewrite the draft in an email compose body while keeping signature and thread")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (default: <config dir>/compose-assist/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how a compose body splits into draft, signature and thread
    Segment(SegmentArgs),

    /// Convert a completion body into compose-ready HTML
    Format {
        /// Body file, or `-` for stdin
        file: String,
    },

    /// Rewrite the draft of a compose file once
    Rewrite(RewriteArgs),

    /// Re-capture a compose file every second until Ctrl-C
    Watch(WatchArgs),

    /// List saved prompts
    Prompts,
}

#[derive(Args)]
pub struct SegmentArgs {
    /// Compose body HTML file
    pub file: PathBuf,

    /// Signature text of a fresh compose window
    #[arg(long)]
    pub signature: Option<String>,
}

#[derive(Args)]
#[command(group = clap::ArgGroup::new("request").required(true).args(["prompt", "instruction"]))]
pub struct RewriteArgs {
    /// Compose body HTML file
    pub file: PathBuf,

    /// Saved prompt id or name
    #[arg(long)]
    pub prompt: Option<String>,

    /// Free-form instruction
    #[arg(long)]
    pub instruction: Option<String>,

    /// Signature text of a fresh compose window
    #[arg(long)]
    pub signature: Option<String>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Compose body HTML file
    pub file: PathBuf,

    /// Signature text of a fresh compose window
    #[arg(long, conflicts_with = "fresh")]
    pub signature: Option<String>,

    /// The file holds a freshly opened compose window; learn the signature from its first capture
    #[arg(long)]
    pub fresh: bool,
}

/// Command-line interface handler
pub struct CliHandler {
    config: AssistConfig,
}

impl CliHandler {
    /// Load configuration from `config_path` or the default location
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let path = match config_path {
            Some(path) => path,
            None => AssistConfig::default_path()
                .ok_or_else(|| anyhow!("Cannot find config directory"))?,
        };
        let config = AssistConfig::load_from_file(&path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?;
        tracing::debug!("Configuration loaded from {}", path.display());
        Ok(Self { config })
    }

    pub fn with_config(config: AssistConfig) -> Self {
        Self { config }
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Segment(args) => self.handle_segment(args).await,
            Commands::Format { file } => self.handle_format(&file).await,
            Commands::Rewrite(args) => self.handle_rewrite(args).await,
            Commands::Watch(args) => self.handle_watch(args).await,
            Commands::Prompts => self.handle_prompts(),
        }
    }

    async fn handle_segment(&self, args: SegmentArgs) -> Result<()> {
        let html = read_body(&args.file).await?;
        let mut session = session_for(args.signature);
        let capture = session.capture(&html).clone();
        let fragments = segment(&html, session.signature_template());

        println!("📝 Draft ({} chars)", capture.draft_text.chars().count());
        println!("{}", capture.draft_text);
        println!();
        println!("🧵 Thread ({} chars)", capture.thread_text.chars().count());
        println!("{}", capture.thread_text);
        println!();
        println!("✍️  Signature markup: {} bytes", fragments.signature_html.len());
        println!("📎 Thread markup: {} bytes", fragments.thread_html.len());
        Ok(())
    }

    async fn handle_format(&self, file: &str) -> Result<()> {
        let body = if file == "-" {
            let mut body = String::new();
            tokio::io::stdin()
                .read_to_string(&mut body)
                .await
                .context("Failed to read stdin")?;
            body
        } else {
            read_body(Path::new(file)).await?
        };
        println!("{}", format_for_insertion(&body));
        Ok(())
    }

    async fn handle_rewrite(&self, args: RewriteArgs) -> Result<()> {
        let instruction = match (&args.prompt, &args.instruction) {
            (_, Some(instruction)) => instruction.clone(),
            (Some(key), None) => self.prompt_instruction(key)?,
            (None, None) => return Err(anyhow!("Either --prompt or --instruction is required")),
        };
        let provider = ProviderFactory::create_provider(&self.config)?;
        let host = FileHost::new(&args.file);
        let mut assistant = rewrite_assistant(
            host.clone(),
            provider,
            self.config.max_context_chars,
            args.signature,
        );

        assistant.capture().await?;
        let result = assistant.process(&instruction).await?;

        println!("✅ Draft rewritten in {}", host.path().display());
        if result.has_subject() {
            println!("📨 Subject: {} ({})", result.subject, host.subject_path().display());
        }
        Ok(())
    }

    async fn handle_watch(&self, args: WatchArgs) -> Result<()> {
        let provider = ProviderFactory::create_provider(&self.config)?;
        let host: Arc<dyn MailHost> = Arc::new(FileHost::new(&args.file));
        let session = if args.fresh {
            ComposeSession::new()
        } else {
            session_for(args.signature)
        };
        let assistant = ComposeAssistant::new(host, provider, self.config.max_context_chars)
            .with_session(session);
        let mut handle = spawn_assistant(assistant);

        println!("👀 Watching {} (Ctrl-C to stop)", args.file.display());
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    let _ = handle.cmd_tx.send(AssistCommand::Shutdown).await;
                    break;
                }
                event = handle.event_rx.recv() => match event {
                    Some(AssistEvent::Captured { draft_chars, thread_chars }) => {
                        tracing::info!("Captured draft {} chars, thread {} chars", draft_chars, thread_chars);
                    }
                    Some(AssistEvent::Processed { subject }) => match subject {
                        Some(subject) => println!("✅ Draft rewritten, subject: {}", subject),
                        None => println!("✅ Draft rewritten"),
                    },
                    Some(AssistEvent::Failed(message)) => println!("❌ {}", message),
                    None => break,
                },
            }
        }

        println!("👋 Stopped");
        Ok(())
    }

    fn handle_prompts(&self) -> Result<()> {
        if self.config.saved_prompts.is_empty() {
            println!("No saved prompts");
            return Ok(());
        }
        println!("💬 Saved prompts:");
        for prompt in &self.config.saved_prompts {
            println!("  {:<10} {:<12} {}", prompt.id, prompt.name, prompt.instruction);
        }
        Ok(())
    }

    fn prompt_instruction(&self, key: &str) -> Result<String> {
        self.config
            .find_prompt(key)
            .map(|prompt| prompt.instruction.clone())
            .ok_or_else(|| anyhow!("No saved prompt '{}'", key))
    }
}

/// Assistant used by `rewrite`: one file, one provider, no template learning
/// unless a signature is given
pub fn rewrite_assistant(
    host: FileHost,
    provider: Box<dyn CompletionProvider>,
    max_context_chars: usize,
    signature: Option<String>,
) -> ComposeAssistant {
    ComposeAssistant::new(Arc::new(host), provider, max_context_chars)
        .with_session(session_for(signature))
}

/// A file may already hold a typed draft, so its first capture never seeds the template
fn session_for(signature: Option<String>) -> ComposeSession {
    match signature {
        Some(template) => ComposeSession::with_template(template),
        None => ComposeSession::without_learning(),
    }
}

async fn read_body(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
