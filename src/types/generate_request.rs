use serde::{Deserialize, Serialize};

use crate::types::Context;

/// Sampling temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f64 = 0.8;

/// Body of a `POST /generate` request.
///
/// The backend answers with a chunked body, one [`GenerateChunk`] per chunk.
///
/// [`GenerateChunk`]: crate::types::GenerateChunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model tag, as listed by the model catalog.
    pub model: String,

    /// Text of the user turn being answered.
    pub prompt: String,

    /// System prompt.
    pub system: String,

    /// Prompt template override.  Always empty: the model's own template is used.
    #[serde(default)]
    pub template: String,

    /// Continuation state from the previous exchange, empty for the first one.
    #[serde(default)]
    pub context: Vec<i64>,

    /// Sampling options.
    pub options: GenerateOptions,
}

impl GenerateRequest {
    /// Create a new `GenerateRequest` with default options and no context.
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: system.into(),
            template: String::new(),
            context: Vec::new(),
            options: GenerateOptions::default(),
        }
    }

    /// Continue from a previous exchange.  `None` sends an empty context.
    pub fn with_context(mut self, context: Option<&Context>) -> Self {
        self.context = context.map(|c| c.tokens().to_vec()).unwrap_or_default();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.options.temperature = temperature;
        self
    }
}

/// Sampling options of a generate request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn first_request_has_empty_context() {
        let request = GenerateRequest::new("llama2", "2+2?", "You are terse.");

        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "llama2",
                "prompt": "2+2?",
                "system": "You are terse.",
                "template": "",
                "context": [],
                "options": {"temperature": 0.8}
            })
        );
    }

    #[test]
    fn context_is_carried_forward() {
        let context = Context::new(vec![1, 2, 3]);
        let request = GenerateRequest::new("llama2", "and 3+3?", "")
            .with_context(Some(&context))
            .with_temperature(0.2);

        let json = to_value(&request).unwrap();
        assert_eq!(json["context"], json!([1, 2, 3]));
        assert_eq!(json["options"]["temperature"], json!(0.2));
    }
}
