//! Per-session request configuration.

use std::time::Duration;

use crate::types::DEFAULT_TEMPERATURE;

/// Default system prompt sent with every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Default base URL of the generate API.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434/api/";

/// Default timeout for establishing a connection and for non-streaming calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings that shape every request a session dispatches.
///
/// The model starts out empty; a request cannot be dispatched until one has
/// been chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Name of the model to generate with.
    pub model: String,

    /// System prompt sent with every request.
    pub system_prompt: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Base URL of the generate API, ending in a slash.
    pub base_url: String,

    /// Connection and catalog timeout.
    pub timeout: Duration,
}

impl SessionConfig {
    /// Creates a configuration with default values and no model.
    pub fn new() -> Self {
        Self {
            model: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the base URL.  A trailing slash is added when missing so relative
    /// endpoints resolve beneath it.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True once a model has been chosen.
    pub fn has_model(&self) -> bool {
        !self.model.trim().is_empty()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SessionConfig::new();
        assert_eq!(config.model, "");
        assert!(!config.has_model());
        assert_eq!(config.system_prompt, "You are a helpful assistant.");
        assert_eq!(config.temperature, 0.8);
        assert_eq!(config.base_url, "http://127.0.0.1:11434/api/");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn builder_pattern() {
        let config = SessionConfig::new()
            .with_model("llama2")
            .with_system_prompt("You are terse.")
            .with_temperature(0.2)
            .with_timeout(Duration::from_secs(5));
        assert!(config.has_model());
        assert_eq!(config.model, "llama2");
        assert_eq!(config.system_prompt, "You are terse.");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let config = SessionConfig::new().with_base_url("http://gpu-box:11434/api");
        assert_eq!(config.base_url, "http://gpu-box:11434/api/");
        let config = SessionConfig::new().with_base_url("http://gpu-box:11434/api/");
        assert_eq!(config.base_url, "http://gpu-box:11434/api/");
    }

    #[test]
    fn blank_model_is_not_a_model() {
        assert!(!SessionConfig::new().with_model("   ").has_model());
    }
}
