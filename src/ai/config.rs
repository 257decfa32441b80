//! Provider settings and saved prompts

use crate::ai::error::{AssistError, AssistResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Completion vendors the assistant can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Chat-completion shape at api.openai.com
    OpenAI,
    /// Message shape at api.anthropic.com
    Claude,
    /// Generate-content shape at generativelanguage.googleapis.com
    Gemini,
    /// Chat-completion shape at a user supplied endpoint
    Custom,
}

impl ProviderKind {
    /// Model used when the settings leave it out
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI | ProviderKind::Custom => "gpt-4o-mini",
            ProviderKind::Claude => "claude-3-5-haiku-latest",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAI => write!(f, "OpenAI"),
            ProviderKind::Claude => write!(f, "Claude"),
            ProviderKind::Gemini => write!(f, "Gemini"),
            ProviderKind::Custom => write!(f, "Custom"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "custom" => Ok(ProviderKind::Custom),
            other => Err(AssistError::config_error(format!("Unknown provider '{}'", other))),
        }
    }
}

/// Credentials and overrides for one provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// A reusable instruction the user can pick instead of typing one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPrompt {
    pub id: String,
    pub name: String,
    pub instruction: String,
}

impl SavedPrompt {
    fn new(id: &str, name: &str, instruction: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            instruction: instruction.to_string(),
        }
    }
}

/// Assistant configuration, stored as TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Key into `providers`, also naming the vendor shape
    pub active_provider: String,

    /// Upper bound on the context sent with each request, in characters
    pub max_context_chars: usize,

    /// No timeout unless set
    pub request_timeout_secs: Option<u64>,

    /// Settings per provider name
    pub providers: HashMap<String, ProviderSettings>,

    pub saved_prompts: Vec<SavedPrompt>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            active_provider: "openai".to_string(),
            max_context_chars: 12_000,
            request_timeout_secs: None,
            providers: HashMap::new(),
            saved_prompts: vec![
                SavedPrompt::new(
                    "polish",
                    "Polish",
                    "Fix grammar and spelling and tighten the wording without changing the meaning.",
                ),
                SavedPrompt::new(
                    "formal",
                    "Make formal",
                    "Rewrite the draft in a polite, professional tone.",
                ),
                SavedPrompt::new(
                    "shorten",
                    "Shorten",
                    "Make the draft shorter while keeping every request and date.",
                ),
                SavedPrompt::new(
                    "reply",
                    "Draft reply",
                    "Write a reply to the latest message in the thread, using the draft as notes.",
                ),
            ],
        }
    }
}

impl AssistConfig {
    /// Default location: `<config dir>/compose-assist/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("compose-assist").join("config.toml"))
    }

    /// Load configuration from file; a missing file yields the defaults
    pub async fn load_from_file(path: &Path) -> AssistResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AssistError::config_error(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> AssistResult<Self> {
        toml::from_str(content)
            .map_err(|e| AssistError::config_error(format!("Failed to parse config: {}", e)))
    }

    /// Vendor shape of the active provider
    pub fn active_kind(&self) -> AssistResult<ProviderKind> {
        self.active_provider.parse()
    }

    /// Settings of the active provider
    pub fn active_settings(&self) -> AssistResult<&ProviderSettings> {
        self.providers.get(&self.active_provider).ok_or_else(|| {
            AssistError::config_error(format!(
                "No settings for provider '{}'",
                self.active_provider
            ))
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Look a saved prompt up by id, or by name ignoring case
    pub fn find_prompt(&self, key: &str) -> Option<&SavedPrompt> {
        self.saved_prompts
            .iter()
            .find(|p| p.id == key)
            .or_else(|| {
                self.saved_prompts
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(key))
            })
    }

    /// Check everything a completion call needs, before any network traffic
    pub fn validate(&self) -> AssistResult<()> {
        if self.max_context_chars == 0 {
            return Err(AssistError::config_error(
                "Max context length must be greater than 0",
            ));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(AssistError::config_error(
                "Request timeout must be greater than 0",
            ));
        }

        let kind = self.active_kind()?;
        let settings = self.active_settings()?;

        if settings.api_key.trim().is_empty() {
            return Err(AssistError::config_error(format!(
                "No API key configured for {}",
                self.active_provider
            )));
        }

        match (&settings.endpoint, kind) {
            (None, ProviderKind::Custom) => {
                return Err(AssistError::config_error(
                    "Custom provider requires an endpoint",
                ));
            }
            (Some(endpoint), _) => {
                let url = Url::parse(endpoint).map_err(|e| {
                    AssistError::config_error(format!("Invalid endpoint '{}': {}", endpoint, e))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(AssistError::config_error(format!(
                        "Endpoint must use http or https: {}",
                        endpoint
                    )));
                }
            }
            (None, _) => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_with(provider: &str, settings: ProviderSettings) -> AssistConfig {
        let mut config = AssistConfig {
            active_provider: provider.to_string(),
            ..AssistConfig::default()
        };
        config.providers.insert(provider.to_string(), settings);
        config
    }

    fn keyed(key: &str) -> ProviderSettings {
        ProviderSettings {
            api_key: key.to_string(),
            ..ProviderSettings::default()
        }
    }

    #[test]
    fn test_provider_kind_names() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Claude);
        assert_eq!("claude".parse::<ProviderKind>().unwrap(), ProviderKind::Claude);
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("custom".parse::<ProviderKind>().unwrap(), ProviderKind::Custom);
        assert!(matches!(
            "ollama".parse::<ProviderKind>(),
            Err(AssistError::Configuration { .. })
        ));
    }

    #[test]
    fn test_default_config_needs_a_key() {
        let config = AssistConfig::default();
        assert_eq!(config.max_context_chars, 12_000);
        assert!(config.request_timeout().is_none());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation() {
        assert!(config_with("openai", keyed("sk-test")).validate().is_ok());
        assert!(config_with("gemini", keyed("g-key")).validate().is_ok());

        let err = config_with("claude", keyed("  ")).validate().unwrap_err();
        assert_eq!(
            err,
            AssistError::config_error("No API key configured for claude")
        );

        let err = config_with("custom", keyed("k")).validate().unwrap_err();
        assert!(err.to_string().contains("endpoint"));

        let mut custom = keyed("k");
        custom.endpoint = Some("not a url".to_string());
        assert!(config_with("custom", custom.clone()).validate().is_err());

        custom.endpoint = Some("ftp://llm.internal/v1".to_string());
        assert!(config_with("custom", custom.clone()).validate().is_err());

        custom.endpoint = Some("http://localhost:8080/v1/chat/completions".to_string());
        assert!(config_with("custom", custom).validate().is_ok());

        let mut config = config_with("openai", keyed("sk"));
        config.max_context_chars = 0;
        assert!(config.validate().is_err());

        let mut config = config_with("openai", keyed("sk"));
        config.active_provider = "mistral".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_active_provider_without_settings() {
        let config = AssistConfig {
            active_provider: "gemini".to_string(),
            ..AssistConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("No settings for provider 'gemini'"));
    }

    #[test]
    fn test_find_prompt() {
        let config = AssistConfig::default();
        assert_eq!(config.find_prompt("shorten").unwrap().name, "Shorten");
        assert_eq!(config.find_prompt("make FORMAL").unwrap().id, "formal");
        assert!(config.find_prompt("missing").is_none());
    }

    #[test]
    fn test_from_toml() {
        let config = AssistConfig::from_toml(
            r#"
active_provider = "claude"
max_context_chars = 4000
request_timeout_secs = 45

[providers.claude]
api_key = "sk-ant-test"
model = "claude-3-5-sonnet-latest"

[[saved_prompts]]
id = "thanks"
name = "Say thanks"
instruction = "Write a short thank-you reply."
"#,
        )
        .unwrap();

        assert_eq!(config.active_kind().unwrap(), ProviderKind::Claude);
        assert_eq!(
            config.active_settings().unwrap().model.as_deref(),
            Some("claude-3-5-sonnet-latest")
        );
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(45)));
        assert_eq!(config.saved_prompts.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_toml_is_a_config_error() {
        let err = AssistConfig::from_toml("active_provider = [").unwrap_err();
        assert!(matches!(err, AssistError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let missing = AssistConfig::load_from_file(&config_path).await.unwrap();
        assert_eq!(missing, AssistConfig::default());

        let config = config_with("openai", keyed("sk-file"));
        tokio::fs::write(&config_path, toml::to_string_pretty(&config).unwrap())
            .await
            .unwrap();

        let loaded = AssistConfig::load_from_file(&config_path).await.unwrap();
        assert_eq!(loaded.active_settings().unwrap().api_key, "sk-file");
        assert_eq!(loaded.saved_prompts, config.saved_prompts);
    }
}
