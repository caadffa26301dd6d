//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the REPL runs with.

use arrrg_derive::CommandLine;

use super::commands::parse_f64_in_range;
use crate::config::SessionConfig;
use crate::error::Error;

/// Command-line arguments for the palaver-chat tool.
#[derive(CommandLine, Debug, Default, Eq, PartialEq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: first model the backend lists)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Base URL of the generate API.
    #[arrrg(optional, "API base URL (default: http://127.0.0.1:11434/api/)", "URL")]
    pub host: Option<String>,

    /// Sampling temperature, between 0 and 2.
    #[arrrg(optional, "Sampling temperature between 0 and 2 (default: 0.8)", "TEMP")]
    pub temperature: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Settings for every request the conversation sends.
    pub session: SessionConfig,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values and color enabled.
    pub fn new() -> Self {
        Self {
            session: SessionConfig::new(),
            use_color: true,
        }
    }

    /// Uses `base_url` unless one was already chosen explicitly.
    pub fn with_default_base_url(mut self, base_url: Option<String>) -> Self {
        if self.session.base_url == crate::config::DEFAULT_BASE_URL
            && let Some(base_url) = base_url
        {
            self.session = self.session.with_base_url(base_url);
        }
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self, Error> {
        let mut session = SessionConfig::new();
        if let Some(model) = args.model {
            session = session.with_model(model);
        }
        if let Some(system) = args.system {
            session = session.with_system_prompt(system);
        }
        if let Some(host) = args.host {
            session = session.with_base_url(host);
        }
        if let Some(temperature) = args.temperature {
            let temperature = parse_f64_in_range(&temperature, 0.0, 2.0).map_err(|err| {
                Error::validation(format!("--temperature {err}"), Some("temperature".to_string()))
            })?;
            session = session.with_temperature(temperature);
        }
        Ok(ChatConfig {
            session,
            use_color: !args.no_color,
        })
    }
}
