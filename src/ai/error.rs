//! Error types for the assistant

use thiserror::Error;

/// Result type for assistant operations
pub type AssistResult<T> = Result<T, AssistError>;

/// Everything that can stop a capture or process action.
///
/// Unparseable completions are absent on purpose: they degrade to plain body
/// text instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssistError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Could not read the compose body: {message}")]
    HostRead { message: String },

    #[error("Could not update the draft: {message}")]
    HostWrite { message: String },
}

impl AssistError {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        AssistError::Configuration {
            message: message.into(),
        }
    }

    /// Create a transport error without an HTTP status
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AssistError::Transport {
            provider: provider.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a transport error for a non-success HTTP status
    pub fn http_status(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, message.trim())
        };
        AssistError::Transport {
            provider: provider.into(),
            status: Some(status),
            message,
        }
    }

    /// Create a host read error
    pub fn host_read(message: impl Into<String>) -> Self {
        AssistError::HostRead {
            message: message.into(),
        }
    }

    /// Create a host write error
    pub fn host_write(message: impl Into<String>) -> Self {
        AssistError::HostWrite {
            message: message.into(),
        }
    }

    /// HTTP status reported by the vendor, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            AssistError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Short single-line message suitable for showing to the user
    pub fn user_message(&self) -> String {
        const MAX_CHARS: usize = 200;
        let line = self.to_string().split_whitespace().collect::<Vec<_>>().join(" ");
        if line.chars().count() <= MAX_CHARS {
            return line;
        }
        let mut short: String = line.chars().take(MAX_CHARS - 3).collect();
        short.push_str("...");
        short
    }
}

impl From<reqwest::Error> for AssistError {
    fn from(err: reqwest::Error) -> Self {
        AssistError::Transport {
            provider: "network".to_string(),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
